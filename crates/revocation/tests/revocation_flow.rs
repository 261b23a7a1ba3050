use rand::{rngs::StdRng, SeedableRng};

use scor_ahibe_engine::ahibe::{decapsulate, delegate, keygen, setup};
use scor_ahibe_revocation::chain::{ChainReader, ChainWriter};
use scor_ahibe_revocation::epoch::EpochDays;
use scor_ahibe_revocation::issuer::build_revocation;
use scor_ahibe_revocation::keyfile::{export_delegate_key, import_delegate_key};
use scor_ahibe_revocation::pointer::PointerStrategy;
use scor_ahibe_revocation::record::RevocationRecord;
use scor_ahibe_revocation::tracing::LoggingConfig;
use scor_ahibe_revocation::utils;
use scor_ahibe_revocation::verify::{VerificationOutcome, Verifier, VerifyError};

mod test_utils;
use test_utils::{InMemoryBlobStore, InMemoryChain};

const HOLDER: &str = "holder:alice@example.com";
const OTHER_HOLDER: &str = "holder:bob@example.com";
const EPOCH: &str = "2025-10-30";

fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

#[test]
fn revocation_lifecycle_end_to_end() {
    scor_ahibe_revocation::tracing::setup_logger(LoggingConfig::default_for_test());
    let mut rng = seeded(2024);
    let (pp, msk) = setup(3, &mut rng).unwrap();

    // Holder receives a depth-1 key and scopes it to the revocation epoch.
    let holder_sk = keygen(&pp, &msk, &[HOLDER.to_string()]).unwrap();
    let epoch_sk = delegate(&pp, &holder_sk, EPOCH).unwrap();

    let store = InMemoryBlobStore::default();
    let issuer_pointers = PointerStrategy::BlobStore(Box::new(store.clone()));
    let (record, publish) =
        build_revocation(&pp, HOLDER, EPOCH, &issuer_pointers, &mut rng).unwrap();
    assert_eq!(record.ciphertext.len(), 176);
    assert_eq!(publish.epoch_days, EpochDays(20_391));

    let chain = InMemoryChain::new();
    chain
        .publish(publish.key, publish.epoch_days, &publish.pointer)
        .unwrap();

    let verifier = Verifier::new(&chain, PointerStrategy::BlobStore(Box::new(store.clone())));

    // Truth table: before the effective date, after it, and an unrelated
    // holder with no record.
    assert_eq!(
        verifier.status(HOLDER, "2024-01-01").unwrap(),
        VerificationOutcome::Valid
    );
    assert_eq!(
        verifier.status(HOLDER, EPOCH).unwrap(),
        VerificationOutcome::Revoked
    );
    assert_eq!(
        verifier.status(OTHER_HOLDER, EPOCH).unwrap(),
        VerificationOutcome::Valid
    );

    // Cryptographic confirmation with the epoch-scoped key against the
    // issuer's session key.
    assert_eq!(
        verifier
            .verify_confirmed(HOLDER, EPOCH, &epoch_sk, Some(&record.session_key))
            .unwrap(),
        VerificationOutcome::Revoked
    );

    // Un-revoke supersedes the publish and bumps the version.
    chain.unrevoke(publish.key).unwrap();
    assert_eq!(
        verifier.status(HOLDER, EPOCH).unwrap(),
        VerificationOutcome::Valid
    );
    let info = chain.get_info(publish.key).unwrap().unwrap();
    assert_eq!(info.version, 2);

    // A second publish is possible once un-revoked.
    chain
        .publish(publish.key, publish.epoch_days, &publish.pointer)
        .unwrap();
    assert_eq!(
        verifier.status(HOLDER, EPOCH).unwrap(),
        VerificationOutcome::Revoked
    );
}

#[test]
fn confirmation_fails_for_a_key_scoped_to_another_epoch() {
    let mut rng = seeded(2030);
    let (pp, msk) = setup(3, &mut rng).unwrap();
    let holder_sk = keygen(&pp, &msk, &[HOLDER.to_string()]).unwrap();
    // Key for the day after the published epoch.
    let wrong_epoch_sk = delegate(&pp, &holder_sk, "2025-10-31").unwrap();

    let store = InMemoryBlobStore::default();
    let (record, publish) = build_revocation(
        &pp,
        HOLDER,
        EPOCH,
        &PointerStrategy::BlobStore(Box::new(store.clone())),
        &mut rng,
    )
    .unwrap();
    let chain = InMemoryChain::new();
    chain
        .publish(publish.key, publish.epoch_days, &publish.pointer)
        .unwrap();

    // The wrong-epoch key completes decapsulation but recovers unrelated
    // bytes, so the challenge comparison rejects it.
    let verifier = Verifier::new(&chain, PointerStrategy::BlobStore(Box::new(store)));
    assert!(matches!(
        verifier.verify_confirmed(HOLDER, "2025-10-31", &wrong_epoch_sk, Some(&record.session_key)),
        Err(VerifyError::ChallengeMismatch)
    ));
}

#[test]
fn missing_blob_degrades_to_unknown() {
    let mut rng = seeded(2025);
    let (pp, msk) = setup(3, &mut rng).unwrap();
    let holder_sk = keygen(&pp, &msk, &[HOLDER.to_string()]).unwrap();
    let epoch_sk = delegate(&pp, &holder_sk, EPOCH).unwrap();

    // Published without a blob store: the pointer is the content hash and
    // nothing can serve it.
    let (record, publish) =
        build_revocation(&pp, HOLDER, EPOCH, &PointerStrategy::Deterministic, &mut rng).unwrap();
    assert!(record.storage_pointer.starts_with("cid-sha256-"));

    let chain = InMemoryChain::new();
    chain
        .publish(publish.key, publish.epoch_days, &publish.pointer)
        .unwrap();

    let verifier = Verifier::new(&chain, PointerStrategy::Deterministic);
    assert_eq!(
        verifier.status(HOLDER, EPOCH).unwrap(),
        VerificationOutcome::Revoked
    );
    assert_eq!(
        verifier
            .verify_confirmed(HOLDER, EPOCH, &epoch_sk, Some(&record.session_key))
            .unwrap(),
        VerificationOutcome::UnknownBlobMissing
    );

    // Same degradation when a store is configured but the blob is gone.
    let verifier = Verifier::new(
        &chain,
        PointerStrategy::BlobStore(Box::new(InMemoryBlobStore::default())),
    );
    assert_eq!(
        verifier
            .verify_confirmed(HOLDER, EPOCH, &epoch_sk, Some(&record.session_key))
            .unwrap(),
        VerificationOutcome::UnknownBlobMissing
    );
}

#[test]
fn delegate_key_file_transfers_decryption_rights() {
    let mut rng = seeded(2026);
    let (pp, msk) = setup(3, &mut rng).unwrap();
    let holder_sk = keygen(&pp, &msk, &[HOLDER.to_string()]).unwrap();
    let epoch_sk = delegate(&pp, &holder_sk, EPOCH).unwrap();

    let file = export_delegate_key(&epoch_sk, "transfer passphrase", &mut rng).unwrap();
    let imported = import_delegate_key(&file, "transfer passphrase", &pp).unwrap();

    let store = InMemoryBlobStore::default();
    let (record, publish) = build_revocation(
        &pp,
        HOLDER,
        EPOCH,
        &PointerStrategy::BlobStore(Box::new(store.clone())),
        &mut rng,
    )
    .unwrap();
    let chain = InMemoryChain::new();
    chain
        .publish(publish.key, publish.epoch_days, &publish.pointer)
        .unwrap();

    let verifier = Verifier::new(&chain, PointerStrategy::BlobStore(Box::new(store)));
    assert_eq!(
        verifier
            .verify_confirmed(HOLDER, EPOCH, &imported, Some(&record.session_key))
            .unwrap(),
        VerificationOutcome::Revoked
    );

    assert_eq!(
        decapsulate(&imported, &record.ciphertext).unwrap(),
        record.session_key
    );
}

#[test]
fn records_survive_a_disk_round_trip() {
    let mut rng = seeded(2027);
    let (pp, _msk) = setup(2, &mut rng).unwrap();
    let (record, _publish) =
        build_revocation(&pp, HOLDER, EPOCH, &PointerStrategy::Deterministic, &mut rng).unwrap();

    let dir = std::env::temp_dir().join("scor-ahibe-record-test");
    let path = dir.join(format!("{}.json", EPOCH));
    utils::write_json(&path, &record).unwrap();
    let read: RevocationRecord = utils::read_json(&path).unwrap();
    assert_eq!(read, record);
    std::fs::remove_dir_all(&dir).ok();
}

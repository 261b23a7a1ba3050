//! JSON file persistence for records and key files. Writes go through a
//! sibling temp file and a rename, so an interrupted export never leaves a
//! truncated artefact at the final path.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("JsonError({0:#?})")]
    JsonError(#[from] serde_json::Error),

    #[error("IoError({0:#?})")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub fn read_json<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T> {
    let file = File::open(path)?;
    let res = serde_json::from_reader(BufReader::new(file))?;
    Ok(res)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(value)?;
    let staging = path.with_extension("tmp");
    fs::write(&staging, &json)?;
    if let Err(error) = fs::rename(&staging, path) {
        fs::remove_file(&staging).ok();
        return Err(error.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Probe {
        name: String,
        value: u64,
    }

    #[test]
    fn json_files_round_trip() {
        let dir = std::env::temp_dir().join("scor-ahibe-utils-test");
        let path = dir.join("probe.json");
        let probe = Probe {
            name: "probe".to_string(),
            value: 7,
        };
        write_json(&path, &probe).unwrap();
        let read: Probe = read_json(&path).unwrap();
        assert_eq!(read, probe);
        // The staging file is gone once the rename lands.
        assert!(!path.with_extension("tmp").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rewrites_replace_the_previous_contents() {
        let dir = std::env::temp_dir().join("scor-ahibe-utils-rewrite-test");
        let path = dir.join("probe.json");
        write_json(
            &path,
            &Probe {
                name: "first".to_string(),
                value: 1,
            },
        )
        .unwrap();
        let second = Probe {
            name: "second".to_string(),
            value: 2,
        };
        write_json(&path, &second).unwrap();
        let read: Probe = read_json(&path).unwrap();
        assert_eq!(read, second);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_files_surface_io_errors() {
        let missing = std::env::temp_dir().join("scor-ahibe-utils-test-missing.json");
        assert!(matches!(
            read_json::<_, Probe>(&missing).unwrap_err(),
            Error::IoError(_)
        ));
    }
}

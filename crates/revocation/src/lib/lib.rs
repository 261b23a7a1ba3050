pub mod chain;
pub mod epoch;
pub mod io;
pub mod issuer;
pub mod keyfile;
pub mod pointer;
pub mod record;
pub mod tracing;
pub mod utils;
pub mod verify;

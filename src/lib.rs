pub mod api;
pub mod config;
pub mod errors;
pub mod schedule;
pub mod signing;
pub mod ui;

pub use errors::{SignError, TransportError};
pub use signing::{SignResult, SignStatus, Signer, SigningRequest};

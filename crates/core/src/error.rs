use thiserror::Error;

/// Errors produced by the foundation types themselves. Richer error
/// enums live in the crates that own the failing operation.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),
}

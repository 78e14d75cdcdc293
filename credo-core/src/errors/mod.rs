//! Error types for the credo workspace.
//!
//! Each subsystem defines its own `thiserror` enum; `CredoError` aggregates
//! them so protocol code can propagate any failure with `?`.

mod bus_error;
mod protocol_error;
mod storage_error;

pub use bus_error::BusError;
pub use protocol_error::ProtocolError;
pub use storage_error::StorageError;

/// Workspace-wide result alias.
pub type CredoResult<T> = Result<T, CredoError>;

/// Top-level error aggregating all subsystem errors.
#[derive(Debug, thiserror::Error)]
pub enum CredoError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("configuration error: {message}")]
    Config { message: String },
}

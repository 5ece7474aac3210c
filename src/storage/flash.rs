//! Storage Area Erase Capability
//!
//! Wiping the whole preference partition is a platform capability, not a
//! store operation: some targets own their flash and can erase and
//! reinitialise it, others cannot. The command layer receives one of these
//! as an `Arc<dyn FlashArea>` when it is built and never checks the platform
//! itself.

use crate::storage::snapshot::SnapshotError;
use thiserror::Error;

/// Errors from a full storage-area erase.
#[derive(Debug, Error)]
pub enum FlashError {
    /// The platform cannot erase its storage area
    #[error("full erase is not supported on this platform")]
    Unsupported,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// A storage area that may support being erased and reinitialised.
pub trait FlashArea: Send + Sync {
    /// Erases every namespace and reinitialises the area.
    fn erase_and_init(&self) -> Result<(), FlashError>;
}

/// A storage area without a full-erase capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unsupported;

impl FlashArea for Unsupported {
    fn erase_and_init(&self) -> Result<(), FlashError> {
        Err(FlashError::Unsupported)
    }
}

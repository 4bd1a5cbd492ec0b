//! Protocol Error Types

use thiserror::Error;

/// Errors raised while decoding protocol values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Traffic light state outside the simulator's enumeration
    #[error("Unknown traffic light state: {0}")]
    UnknownTrafficState(i32),

    /// Command name that does not match any navigation command
    #[error("Unknown navigation command: {0}")]
    UnknownCommand(String),
}

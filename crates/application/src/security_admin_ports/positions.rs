use lendgate_domain::{PermissionKey, Position};

/// Input payload for creating positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePositionInput {
    /// Stable machine code.
    pub code: String,
    /// Display title.
    pub title: String,
}

/// Position with its mapped capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionCapabilities {
    /// Position.
    pub position: Position,
    /// Active permissions mapped to the position.
    pub permissions: Vec<PermissionKey>,
}

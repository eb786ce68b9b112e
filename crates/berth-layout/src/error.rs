use berth_core::PanelId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("panel #{0} is not part of the layout")]
    PanelNotFound(PanelId),

    #[error("panel #{0} cannot be docked onto itself")]
    DockOntoSelf(PanelId),

    #[error("panel #{0} is already part of the layout")]
    DuplicatePanel(PanelId),

    #[error("node belongs to the protected main structure")]
    ProtectedNode,

    #[error("layout was written by the {found} strategy, expected {expected}")]
    ForeignFormat { expected: String, found: String },

    #[error("corrupt layout data at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("layout invariant violated: {0}")]
    Invariant(String),

    #[error("invalid layout config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LayoutError>;

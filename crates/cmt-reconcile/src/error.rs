//! Error types for reconcilers

/// A reconciler operation could not be carried out
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// Requested instance type is not in the current list
    #[error("instance type not in the current candidate list: {0}")]
    NotInList(String),

    /// Nothing is selected (the list is empty)
    #[error("no instance type selected")]
    NoSelection,

    /// Required field missing from a provisioning action
    #[error("missing field: {0}")]
    MissingField(&'static str),
}

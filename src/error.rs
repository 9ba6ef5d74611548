use thiserror::Error;

/// Errors returned by the nested set APIs.
///
/// Everything except [`NestedSetError::Database`] is a usage error detected
/// before any statement is sent to storage.
#[derive(Debug, Error)]
pub enum NestedSetError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("a root node already exists in this tree{}", describe_scope(.scope))]
    DuplicateRoot { scope: Option<String> },

    #[error("cannot turn an existing node into a root node")]
    InvalidRootMutation,

    #[error("node must not already be in the tree to be inserted; use {suggestion}() instead")]
    AlreadyInTree { suggestion: &'static str },

    #[error("{subject} must already be in the tree to {action}")]
    NotInTree {
        subject: &'static str,
        action: &'static str,
    },

    #[error("nodes of different trees cannot be compared or moved across trees")]
    CrossScope,

    #[error("cannot move a node into its own subtree")]
    CyclicMove,

    #[error("cannot move a node to a sibling position of a root node")]
    InvalidSiblingTarget,

    #[error("deletion of a root node is disabled; use delete_tree() to delete an entire tree")]
    RootDeletion,

    #[error("node of a scoped tree has no scope value")]
    MissingScope,

    #[error("nested set invariant violation: {0}")]
    Invariant(String),
}

impl NestedSetError {
    pub fn invariant(detail: impl Into<String>) -> Self {
        Self::Invariant(detail.into())
    }

    pub(crate) fn not_in_tree(subject: &'static str, action: &'static str) -> Self {
        Self::NotInTree { subject, action }
    }
}

fn describe_scope(scope: &Option<String>) -> String {
    match scope {
        Some(scope) => format!(" with scope \"{scope}\""),
        None => "; to allow multiple root nodes, configure a scope column".to_string(),
    }
}

//! SeaORM-centric nested set tree implementation.
//!
//! Each row stores a `(left, right)` interval and a `level`; a node's interval
//! contains the intervals of all its descendants. Reads such as ancestors,
//! descendants or a whole branch become a single range query, while inserts,
//! moves and deletes rewrite the bounds of every row to the right of the
//! change inside one transaction.
//!
//! Tables may hold several independent trees by declaring a scope column.

extern crate self as nested_set;

pub mod config;
pub mod error;
pub mod lock;
pub mod node;
pub mod pending;
pub mod query;
pub mod repository;
pub mod shift;
pub mod traits;

#[cfg(test)]
mod fixtures;

pub mod prelude {
    //! Convenient re-exports for consumers.
    pub use crate::config::{AdvisoryLockStrategy, NestedSetConfig, NestedSetOptions};
    pub use crate::node::TreeNode;
    pub use crate::pending::PendingNode;
    pub use crate::repository::NestedSetRepository;
    pub use crate::traits::NestedSetModel;
}

pub use nested_set_macros::NestedSetModel as NestedSetModelDerive;
#[doc(hidden)]
pub use nested_set_macros::NestedSetModel;
pub use config::{AdvisoryLockKey, AdvisoryLockStrategy, NestedSetConfig, NestedSetOptions};
pub use error::NestedSetError;
pub use node::TreeNode;
pub use pending::{PendingNode, PendingOperation, TreePosition};
pub use query::NestedSetQuery;
pub use repository::NestedSetRepository;
pub use traits::{NestedSetModel, Unscoped};

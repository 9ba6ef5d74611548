use std::fmt;

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, EntityTrait, FromQueryResult, IntoActiveModel, Value,
};

use crate::config::NestedSetConfig;
use crate::error::NestedSetError;

/// Trait implemented by SeaORM `Model` types stored as a nested set.
///
/// Implementations are normally provided by the `#[derive(NestedSetModel)]` macro.
/// A row that was never placed in a tree stores `0` in both its left and right
/// columns.
pub trait NestedSetModel:
    Clone + Send + Sync + 'static + IntoActiveModel<Self::ActiveModel> + FromQueryResult
{
    type Entity: EntityTrait<Model = Self>;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity> + ActiveModelBehavior + Send;
    type Id: Clone + PartialEq + Send + Sync + 'static;
    /// Partition key of the table; [`Unscoped`] for single-tree tables.
    type Scope: Clone + PartialEq + fmt::Display + Send + Sync + 'static;

    fn nested_set_config() -> &'static NestedSetConfig;

    fn id(&self) -> Self::Id;
    fn id_to_value(id: &Self::Id) -> Value;

    fn left(&self) -> i32;
    fn right(&self) -> i32;
    fn level(&self) -> i32;
    fn scope(&self) -> Option<Self::Scope>;
    fn scope_to_value(scope: &Self::Scope) -> Value;

    fn set_left(active: &mut Self::ActiveModel, value: i32);
    fn set_right(active: &mut Self::ActiveModel, value: i32);
    fn set_level(active: &mut Self::ActiveModel, value: i32);
    fn set_scope(active: &mut Self::ActiveModel, scope: Self::Scope);

    fn id_column() -> <Self::Entity as EntityTrait>::Column;
    fn left_column() -> <Self::Entity as EntityTrait>::Column;
    fn right_column() -> <Self::Entity as EntityTrait>::Column;
    fn level_column() -> <Self::Entity as EntityTrait>::Column;
    fn scope_column() -> Option<<Self::Entity as EntityTrait>::Column>;

    fn use_scope() -> bool {
        Self::scope_column().is_some()
    }

    fn is_in_tree(&self) -> bool {
        self.left() > 0 && self.right() > self.left()
    }

    fn is_root(&self) -> bool {
        self.is_in_tree() && self.left() == 1
    }

    fn is_leaf(&self) -> bool {
        self.is_in_tree() && self.right() - self.left() == 1
    }

    fn has_children(&self) -> bool {
        self.right() - self.left() > 1
    }

    fn has_parent(&self) -> bool {
        self.level() > 0
    }

    /// Whether `self` lies strictly inside the interval of `other`.
    fn is_descendant_of(&self, other: &Self) -> Result<bool, NestedSetError> {
        if Self::use_scope() && self.scope() != other.scope() {
            return Err(NestedSetError::CrossScope);
        }

        Ok(self.is_in_tree() && self.left() > other.left() && self.right() < other.right())
    }

    fn is_ancestor_of(&self, other: &Self) -> Result<bool, NestedSetError> {
        other.is_descendant_of(self)
    }
}

/// Scope type of models whose table holds a single tree. It has no values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Unscoped {}

impl fmt::Display for Unscoped {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

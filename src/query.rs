use std::marker::PhantomData;

use log::trace;
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, Order, PaginatorTrait, QueryFilter,
    QueryOrder, Select,
};

use crate::error::NestedSetError;
use crate::traits::NestedSetModel;

type ColumnOf<M> = <<M as NestedSetModel>::Entity as EntityTrait>::Column;

/// Interval-based query over a nested set table.
///
/// Filters accumulate into a single `AND` condition so the same query can be
/// used to find, count or delete rows.
pub struct NestedSetQuery<M>
where
    M: NestedSetModel,
{
    condition: Condition,
    ordering: Vec<(ColumnOf<M>, Order)>,
    _marker: PhantomData<M>,
}

impl<M> Default for NestedSetQuery<M>
where
    M: NestedSetModel,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M> NestedSetQuery<M>
where
    M: NestedSetModel,
{
    pub fn new() -> Self {
        Self {
            condition: Condition::all(),
            ordering: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Add an arbitrary condition, e.g. `Column::Name.eq("x")`.
    pub fn filter(mut self, expr: SimpleExpr) -> Self {
        self.condition = self.condition.add(expr);
        self
    }

    /// Restrict to the tree identified by `scope`; no-op for unscoped models.
    pub fn in_tree(self, scope: Option<&M::Scope>) -> Self {
        match (M::scope_column(), scope) {
            (Some(column), Some(scope)) => self.filter(column.eq(M::scope_to_value(scope))),
            _ => self,
        }
    }

    fn in_tree_of(self, node: &M) -> Self {
        let scope = node.scope();
        self.in_tree(scope.as_ref())
    }

    pub fn filter_by_left(self, left: i32) -> Self {
        self.filter(M::left_column().eq(left))
    }

    pub fn filter_by_right(self, right: i32) -> Self {
        self.filter(M::right_column().eq(right))
    }

    /// Nodes one level below `node` inside its interval.
    pub fn children_of(self, node: &M) -> Self {
        self.descendants_of(node)
            .filter(M::level_column().eq(node.level() + 1))
    }

    /// Nodes strictly inside the interval of `node`.
    pub fn descendants_of(self, node: &M) -> Self {
        self.filter(M::left_column().gt(node.left()))
            .filter(M::right_column().lt(node.right()))
            .in_tree_of(node)
    }

    /// `node` plus its descendants.
    pub fn branch_of(self, node: &M) -> Self {
        self.filter(M::left_column().gte(node.left()))
            .filter(M::right_column().lte(node.right()))
            .in_tree_of(node)
    }

    /// Nodes whose interval strictly contains the interval of `node`.
    pub fn ancestors_of(self, node: &M) -> Self {
        self.filter(M::left_column().lt(node.left()))
            .filter(M::right_column().gt(node.right()))
            .in_tree_of(node)
    }

    /// Rows that have been placed in a tree.
    pub fn positioned(self) -> Self {
        self.filter(M::left_column().gt(0))
    }

    pub fn roots(self) -> Self {
        self.filter_by_left(1)
    }

    /// Exclude `node` itself from the results.
    pub fn prune(self, node: &M) -> Self {
        self.filter(M::id_column().ne(M::id_to_value(&node.id())))
    }

    pub fn order_by(mut self, column: ColumnOf<M>, order: Order) -> Self {
        self.ordering.push((column, order));
        self
    }

    /// Pre-order traversal, i.e. ascending left values.
    pub fn order_by_branch(self, reverse: bool) -> Self {
        self.order_by(M::left_column(), direction(reverse))
    }

    pub fn order_by_level(self, reverse: bool) -> Self {
        self.order_by(M::level_column(), direction(reverse))
    }

    fn select(self) -> Select<M::Entity> {
        let mut select = M::Entity::find().filter(self.condition);
        for (column, order) in self.ordering {
            select = select.order_by(column, order);
        }
        select
    }

    pub async fn find<C: ConnectionTrait>(self, conn: &C) -> Result<Vec<M>, NestedSetError> {
        trace!("nested set find on {}", M::nested_set_config().table_name());
        let rows = self.select().all(conn).await?;
        Ok(rows)
    }

    pub async fn find_one<C: ConnectionTrait>(self, conn: &C) -> Result<Option<M>, NestedSetError> {
        trace!("nested set find_one on {}", M::nested_set_config().table_name());
        let row = self.select().one(conn).await?;
        Ok(row)
    }

    pub async fn count<C: ConnectionTrait>(self, conn: &C) -> Result<u64, NestedSetError> {
        trace!("nested set count on {}", M::nested_set_config().table_name());
        let count = self.select().count(conn).await?;
        Ok(count)
    }

    /// Rewrite `column` to `value` on every matching row; ordering is ignored.
    pub(crate) async fn update<C: ConnectionTrait>(
        self,
        conn: &C,
        column: ColumnOf<M>,
        value: SimpleExpr,
    ) -> Result<u64, NestedSetError> {
        let result = M::Entity::update_many()
            .col_expr(column, value)
            .filter(self.condition)
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    /// Delete every matching row; ordering is ignored.
    pub async fn delete<C: ConnectionTrait>(self, conn: &C) -> Result<u64, NestedSetError> {
        let result = M::Entity::delete_many()
            .filter(self.condition)
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }
}

fn direction(reverse: bool) -> Order {
    if reverse {
        Order::Desc
    } else {
        Order::Asc
    }
}

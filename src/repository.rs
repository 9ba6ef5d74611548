use std::marker::PhantomData;

use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, Order, TransactionTrait};

use crate::config::NestedSetConfig;
use crate::error::NestedSetError;
use crate::lock::LockedTransaction;
use crate::pending::{PendingNode, PendingOperation, PendingParts};
use crate::query::NestedSetQuery;
use crate::shift;
use crate::traits::NestedSetModel;

/// Repository exposing the nested set operations for a given model.
///
/// Read operations take any `ConnectionTrait`. Mutations additionally need
/// `TransactionTrait`: each runs in its own transaction, which becomes a
/// savepoint when `conn` is already a `DatabaseTransaction`.
///
/// Moves and deletes rewrite the bounds of many rows. Only the model passed as
/// `&mut` is refreshed; every other model loaded before the call is stale and
/// should go through [`NestedSetRepository::reload`].
#[derive(Debug, Default)]
pub struct NestedSetRepository<M>
where
    M: NestedSetModel,
{
    _marker: PhantomData<M>,
}

impl<M> NestedSetRepository<M>
where
    M: NestedSetModel,
{
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    fn config(&self) -> &'static NestedSetConfig {
        M::nested_set_config()
    }

    async fn lock<C>(
        &self,
        conn: &C,
        scope: Option<&M::Scope>,
    ) -> Result<LockedTransaction, NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let label = scope.map(ToString::to_string);
        LockedTransaction::acquire(
            self.config().advisory_lock_strategy(),
            conn,
            label.as_deref(),
        )
        .await
    }

    /// Re-read `model` from storage.
    pub async fn reload<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &mut M,
    ) -> Result<(), NestedSetError> {
        let fresh = NestedSetQuery::<M>::new()
            .filter(M::id_column().eq(M::id_to_value(&model.id())))
            .find_one(conn)
            .await?
            .ok_or_else(|| {
                NestedSetError::invariant(format!(
                    "{} row disappeared while being reloaded",
                    self.config().entity_name()
                ))
            })?;
        *model = fresh;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    /// Nearest ancestor of `model`.
    pub async fn parent<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<Option<M>, NestedSetError> {
        if !model.has_parent() {
            return Ok(None);
        }

        NestedSetQuery::<M>::new()
            .ancestors_of(model)
            .order_by_level(true)
            .find_one(conn)
            .await
    }

    pub async fn has_prev_sibling<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<bool, NestedSetError> {
        if !model.is_in_tree() || model.is_root() {
            return Ok(false);
        }

        let count = self.prev_sibling_query(model).count(conn).await?;
        Ok(count > 0)
    }

    pub async fn prev_sibling<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<Option<M>, NestedSetError> {
        if !model.is_in_tree() || model.is_root() {
            return Ok(None);
        }

        self.prev_sibling_query(model).find_one(conn).await
    }

    fn prev_sibling_query(&self, model: &M) -> NestedSetQuery<M> {
        let scope = model.scope();
        NestedSetQuery::new()
            .filter_by_right(model.left() - 1)
            .positioned()
            .in_tree(scope.as_ref())
    }

    pub async fn has_next_sibling<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<bool, NestedSetError> {
        if !model.is_in_tree() {
            return Ok(false);
        }

        let count = self.next_sibling_query(model).count(conn).await?;
        Ok(count > 0)
    }

    pub async fn next_sibling<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<Option<M>, NestedSetError> {
        if !model.is_in_tree() {
            return Ok(None);
        }

        self.next_sibling_query(model).find_one(conn).await
    }

    fn next_sibling_query(&self, model: &M) -> NestedSetQuery<M> {
        let scope = model.scope();
        NestedSetQuery::new()
            .filter_by_left(model.right() + 1)
            .positioned()
            .in_tree(scope.as_ref())
    }

    /// Direct children in branch order.
    pub async fn children<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<Vec<M>, NestedSetError> {
        if !model.has_children() {
            return Ok(Vec::new());
        }

        NestedSetQuery::new()
            .children_of(model)
            .order_by_branch(false)
            .find(conn)
            .await
    }

    pub async fn count_children<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<u64, NestedSetError> {
        if !model.has_children() {
            return Ok(0);
        }

        NestedSetQuery::new().children_of(model).count(conn).await
    }

    pub async fn first_child<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<Option<M>, NestedSetError> {
        self.edge_child(conn, model, false).await
    }

    pub async fn last_child<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<Option<M>, NestedSetError> {
        self.edge_child(conn, model, true).await
    }

    async fn edge_child<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
        reverse: bool,
    ) -> Result<Option<M>, NestedSetError> {
        if !model.has_children() {
            return Ok(None);
        }

        NestedSetQuery::new()
            .children_of(model)
            .order_by_branch(reverse)
            .find_one(conn)
            .await
    }

    /// Children of the parent of `model`, in branch order.
    pub async fn siblings<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
        include_self: bool,
    ) -> Result<Vec<M>, NestedSetError> {
        if model.is_root() {
            return Ok(Vec::new());
        }

        let Some(parent) = self.parent(conn, model).await? else {
            return Ok(Vec::new());
        };

        let mut query = NestedSetQuery::new()
            .children_of(&parent)
            .order_by_branch(false);
        if !include_self {
            query = query.prune(model);
        }
        query.find(conn).await
    }

    /// Every node inside the interval of `model`, in branch order.
    pub async fn descendants<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<Vec<M>, NestedSetError> {
        if !model.has_children() {
            return Ok(Vec::new());
        }

        NestedSetQuery::new()
            .descendants_of(model)
            .order_by_branch(false)
            .find(conn)
            .await
    }

    pub async fn count_descendants<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<u64, NestedSetError> {
        if !model.has_children() {
            return Ok(0);
        }

        NestedSetQuery::new().descendants_of(model).count(conn).await
    }

    /// `model` followed by its descendants, in branch order. A node outside
    /// any tree is its own single-node branch.
    pub async fn branch<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<Vec<M>, NestedSetError> {
        if !model.is_in_tree() {
            return Ok(vec![model.clone()]);
        }

        NestedSetQuery::new()
            .branch_of(model)
            .order_by_branch(false)
            .find(conn)
            .await
    }

    /// Ancestors from the root down to the parent of `model`.
    pub async fn ancestors<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<Vec<M>, NestedSetError> {
        if model.is_root() {
            return Ok(Vec::new());
        }

        NestedSetQuery::new()
            .ancestors_of(model)
            .order_by_branch(false)
            .find(conn)
            .await
    }

    /// Root of the tree identified by `scope` (the only tree when unscoped).
    pub async fn root<C: ConnectionTrait>(
        &self,
        conn: &C,
        scope: Option<&M::Scope>,
    ) -> Result<Option<M>, NestedSetError> {
        require_scope::<M>(scope)?;

        NestedSetQuery::new()
            .roots()
            .in_tree(scope)
            .find_one(conn)
            .await
    }

    /// Roots of every tree in the table.
    pub async fn roots<C: ConnectionTrait>(&self, conn: &C) -> Result<Vec<M>, NestedSetError> {
        let mut query = NestedSetQuery::new().roots();
        if let Some(column) = M::scope_column() {
            query = query.order_by(column, Order::Asc);
        }
        query.find(conn).await
    }

    /// Every positioned node of one tree, in branch order.
    pub async fn tree<C: ConnectionTrait>(
        &self,
        conn: &C,
        scope: Option<&M::Scope>,
    ) -> Result<Vec<M>, NestedSetError> {
        require_scope::<M>(scope)?;

        NestedSetQuery::new()
            .positioned()
            .in_tree(scope)
            .order_by_branch(false)
            .find(conn)
            .await
    }

    // ---------------------------------------------------------------------
    // Insertion
    // ---------------------------------------------------------------------

    /// Persist a pending node and run its queued tree operations in the same
    /// transaction.
    pub async fn save<C>(&self, conn: &C, node: PendingNode<M>) -> Result<M, NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let check_root = node.becomes_root();
        let parts = node.into_parts();

        if M::use_scope() && parts.position.is_some() && parts.scope.is_none() {
            return Err(NestedSetError::MissingScope);
        }

        let scope = parts.scope.clone();
        let guard = self.lock(conn, scope.as_ref()).await?;
        let result = self.save_on(guard.connection(), parts, check_root).await;
        guard.finish(result).await
    }

    async fn save_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        parts: PendingParts<M>,
        check_root: bool,
    ) -> Result<M, NestedSetError> {
        let PendingParts {
            mut active,
            existing,
            position,
            operations,
            ..
        } = parts;

        if let (true, Some(position)) = (check_root, position.as_ref()) {
            let mut query = NestedSetQuery::<M>::new()
                .roots()
                .in_tree(position.scope.as_ref());
            if let Some(existing) = existing.as_ref() {
                query = query.prune(existing);
            }

            if query.count(conn).await? > 0 {
                return Err(NestedSetError::DuplicateRoot {
                    scope: position.scope.as_ref().map(ToString::to_string),
                });
            }
        }

        let queued = operations.len();
        for operation in operations {
            match operation {
                PendingOperation::MakeRoomForLeaf {
                    left,
                    scope,
                    exclude,
                } => {
                    shift::make_room_for_leaf::<M, C>(
                        conn,
                        left,
                        scope.as_ref(),
                        exclude.as_ref(),
                    )
                    .await?;
                }
            }
        }

        if let Some(position) = position {
            M::set_left(&mut active, position.left);
            M::set_right(&mut active, position.right);
            M::set_level(&mut active, position.level);
            if let Some(scope) = position.scope {
                M::set_scope(&mut active, scope);
            }
        }

        let model = match existing {
            Some(_) => active.update(conn).await?,
            None => active.insert(conn).await?,
        };

        debug!(
            "saved {} at [{}, {}] after {queued} queued operation(s)",
            self.config().entity_name(),
            model.left(),
            model.right()
        );
        Ok(model)
    }

    /// Make `node` a root and save it.
    pub async fn create_root<C>(&self, conn: &C, mut node: PendingNode<M>) -> Result<M, NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        node.make_root()?;
        self.save(conn, node).await
    }

    /// Insert `node` as the first child of `parent` and save it.
    pub async fn add_child<C>(
        &self,
        conn: &C,
        parent: &M,
        mut node: PendingNode<M>,
    ) -> Result<M, NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        node.insert_as_first_child_of(parent)?;
        self.save(conn, node).await
    }

    // ---------------------------------------------------------------------
    // Moves
    // ---------------------------------------------------------------------

    pub async fn move_to_first_child_of<C>(
        &self,
        conn: &C,
        node: &mut M,
        parent: &M,
    ) -> Result<(), NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        self.ensure_movable(node, parent, false)?;
        let level_delta = parent.level() - node.level() + 1;
        self.move_subtree_to(conn, node, parent.left() + 1, level_delta)
            .await
    }

    pub async fn move_to_last_child_of<C>(
        &self,
        conn: &C,
        node: &mut M,
        parent: &M,
    ) -> Result<(), NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        self.ensure_movable(node, parent, false)?;
        let level_delta = parent.level() - node.level() + 1;
        self.move_subtree_to(conn, node, parent.right(), level_delta)
            .await
    }

    pub async fn move_to_prev_sibling_of<C>(
        &self,
        conn: &C,
        node: &mut M,
        sibling: &M,
    ) -> Result<(), NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        self.ensure_movable(node, sibling, true)?;
        let level_delta = sibling.level() - node.level();
        self.move_subtree_to(conn, node, sibling.left(), level_delta)
            .await
    }

    pub async fn move_to_next_sibling_of<C>(
        &self,
        conn: &C,
        node: &mut M,
        sibling: &M,
    ) -> Result<(), NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        self.ensure_movable(node, sibling, true)?;
        let level_delta = sibling.level() - node.level();
        self.move_subtree_to(conn, node, sibling.right() + 1, level_delta)
            .await
    }

    fn ensure_movable(&self, node: &M, target: &M, as_sibling: bool) -> Result<(), NestedSetError> {
        if !node.is_in_tree() {
            return Err(NestedSetError::not_in_tree("node", "be moved"));
        }
        if !target.is_in_tree() {
            return Err(NestedSetError::not_in_tree(
                "target node",
                "receive a moved node",
            ));
        }
        if as_sibling && target.is_root() {
            return Err(NestedSetError::InvalidSiblingTarget);
        }
        if M::use_scope() && node.scope() != target.scope() {
            return Err(NestedSetError::CrossScope);
        }
        if (!as_sibling && node.id() == target.id()) || target.is_descendant_of(node)? {
            return Err(NestedSetError::CyclicMove);
        }
        Ok(())
    }

    async fn move_subtree_to<C>(
        &self,
        conn: &C,
        node: &mut M,
        dest_left: i32,
        level_delta: i32,
    ) -> Result<(), NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let scope = node.scope();
        let guard = self.lock(conn, scope.as_ref()).await?;
        let result = self
            .move_subtree_on(guard.connection(), node, dest_left, level_delta)
            .await;
        guard.finish(result).await
    }

    async fn move_subtree_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        node: &mut M,
        dest_left: i32,
        level_delta: i32,
    ) -> Result<(), NestedSetError> {
        let mut left = node.left();
        let mut right = node.right();
        let scope = node.scope();
        let scope = scope.as_ref();
        let tree_size = right - left + 1;

        debug!(
            "moving {} subtree [{left}, {right}] to {dest_left} (level {level_delta:+})",
            self.config().entity_name()
        );

        // open room at the destination
        shift::shift_rl_values::<M, C>(conn, tree_size, dest_left, None, scope, None).await?;

        // the subtree itself sat past the destination and moved with the rest
        if left >= dest_left {
            left += tree_size;
            right += tree_size;
        }

        if level_delta != 0 {
            shift::shift_level::<M, C>(conn, level_delta, left, right, scope).await?;
        }

        shift::shift_rl_values::<M, C>(conn, dest_left - left, left, Some(right), scope, None)
            .await?;

        // close the hole left at the source
        shift::shift_rl_values::<M, C>(conn, -tree_size, right + 1, None, scope, None).await?;

        self.reload(conn, node).await
    }

    // ---------------------------------------------------------------------
    // Deletion
    // ---------------------------------------------------------------------

    /// Delete every descendant of `node`, which becomes a leaf. Returns the
    /// number of deleted rows.
    pub async fn delete_descendants<C>(&self, conn: &C, node: &mut M) -> Result<u64, NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        if !node.is_in_tree() {
            return Err(NestedSetError::not_in_tree(
                "node",
                "delete its descendants",
            ));
        }
        if node.is_leaf() {
            return Ok(0);
        }

        let scope = node.scope();
        let guard = self.lock(conn, scope.as_ref()).await?;
        let result = self.delete_descendants_on(guard.connection(), node).await;
        guard.finish(result).await
    }

    async fn delete_descendants_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        node: &mut M,
    ) -> Result<u64, NestedSetError> {
        let left = node.left();
        let right = node.right();
        let scope = node.scope();

        let deleted = NestedSetQuery::new()
            .descendants_of(node)
            .delete(conn)
            .await?;

        shift::shift_rl_values::<M, C>(conn, left - right + 1, right, None, scope.as_ref(), None)
            .await?;

        self.reload(conn, node).await?;
        debug!(
            "deleted {deleted} descendant(s) of {} [{left}, {right}]",
            self.config().entity_name()
        );
        Ok(deleted)
    }

    /// Delete `node` together with its descendants and close the gap they
    /// leave. Roots can only go through [`NestedSetRepository::delete_tree`].
    pub async fn delete<C>(&self, conn: &C, node: M) -> Result<u64, NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        if node.is_root() {
            return Err(NestedSetError::RootDeletion);
        }

        let scope = node.scope();
        let guard = self.lock(conn, scope.as_ref()).await?;
        let result = self.delete_on(guard.connection(), node).await;
        guard.finish(result).await
    }

    async fn delete_on<C: ConnectionTrait>(&self, conn: &C, mut node: M) -> Result<u64, NestedSetError> {
        let in_tree = node.is_in_tree();
        let mut deleted = 0;

        if in_tree && node.has_children() {
            deleted += self.delete_descendants_on(conn, &mut node).await?;
        }

        deleted += NestedSetQuery::<M>::new()
            .filter(M::id_column().eq(M::id_to_value(&node.id())))
            .delete(conn)
            .await?;

        if in_tree {
            let scope = node.scope();
            shift::shift_rl_values::<M, C>(conn, -2, node.right() + 1, None, scope.as_ref(), None)
                .await?;
        }

        Ok(deleted)
    }

    /// Delete every row of one tree, root included.
    pub async fn delete_tree<C>(
        &self,
        conn: &C,
        scope: Option<&M::Scope>,
    ) -> Result<u64, NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        require_scope::<M>(scope)?;

        let guard = self.lock(conn, scope).await?;
        let result = NestedSetQuery::<M>::new()
            .in_tree(scope)
            .delete(guard.connection())
            .await;
        let deleted = guard.finish(result).await?;

        debug!(
            "deleted tree of {} ({deleted} row(s))",
            self.config().entity_name()
        );
        Ok(deleted)
    }

    /// Recompute every level of one tree from interval nesting. Returns the
    /// number of rows whose stored level was wrong.
    pub async fn fix_levels<C>(
        &self,
        conn: &C,
        scope: Option<&M::Scope>,
    ) -> Result<u64, NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        require_scope::<M>(scope)?;

        let guard = self.lock(conn, scope).await?;
        let result = self.fix_levels_on(guard.connection(), scope).await;
        guard.finish(result).await
    }

    async fn fix_levels_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        scope: Option<&M::Scope>,
    ) -> Result<u64, NestedSetError> {
        let nodes = self.tree(conn, scope).await?;

        // right bounds of the ancestors enclosing the current node
        let mut open: Vec<i32> = Vec::new();
        let mut fixed = 0;

        for node in nodes {
            while open.last().is_some_and(|&right| right < node.left()) {
                open.pop();
            }

            let level = open.len() as i32;
            if node.level() != level {
                NestedSetQuery::<M>::new()
                    .filter(M::id_column().eq(M::id_to_value(&node.id())))
                    .update(conn, M::level_column(), Expr::value(level))
                    .await?;
                fixed += 1;
            }

            open.push(node.right());
        }

        if fixed > 0 {
            debug!(
                "fixed {fixed} level(s) of {}",
                self.config().entity_name()
            );
        }
        Ok(fixed)
    }
}

/// Scoped tables hold several trees, so table-wide operations must name one.
fn require_scope<M: NestedSetModel>(scope: Option<&M::Scope>) -> Result<(), NestedSetError> {
    if M::use_scope() && scope.is_none() {
        return Err(NestedSetError::MissingScope);
    }
    Ok(())
}

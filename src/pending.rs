use std::fmt;

use crate::error::NestedSetError;
use crate::traits::NestedSetModel;

/// Tree coordinates assigned to a node before it is saved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreePosition<S> {
    pub left: i32,
    pub right: i32,
    pub level: i32,
    pub scope: Option<S>,
}

impl<S> TreePosition<S> {
    fn leaf_at(left: i32, level: i32, scope: Option<S>) -> Self {
        Self {
            left,
            right: left + 1,
            level,
            scope,
        }
    }

    pub fn is_root(&self) -> bool {
        self.left == 1
    }
}

/// Statement queued on an unsaved node, run by the save transaction.
pub enum PendingOperation<M>
where
    M: NestedSetModel,
{
    /// Shift every bound at or after `left` by two.
    MakeRoomForLeaf {
        left: i32,
        scope: Option<M::Scope>,
        exclude: Option<M::Id>,
    },
}

impl<M> fmt::Debug for PendingOperation<M>
where
    M: NestedSetModel,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingOperation::MakeRoomForLeaf { left, scope, .. } => f
                .debug_struct("MakeRoomForLeaf")
                .field("left", left)
                .field("scope", &scope.as_ref().map(ToString::to_string))
                .finish_non_exhaustive(),
        }
    }
}

/// A node that has not been written yet, or an existing row being placed
/// into a tree.
///
/// The insert operations only compute coordinates and queue the matching
/// [`PendingOperation`]; nothing touches storage until
/// [`NestedSetRepository::save`](crate::NestedSetRepository::save).
pub struct PendingNode<M>
where
    M: NestedSetModel,
{
    active: M::ActiveModel,
    existing: Option<M>,
    scope: Option<M::Scope>,
    position: Option<TreePosition<M::Scope>>,
    /// Set once `position` was assigned by this node rather than loaded.
    placed: bool,
    operations: Vec<PendingOperation<M>>,
}

impl<M> fmt::Debug for PendingNode<M>
where
    M: NestedSetModel,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingNode")
            .field("active", &self.active)
            .field("existing", &self.existing.is_some())
            .field("scope", &self.scope.as_ref().map(ToString::to_string))
            .field(
                "position",
                &self
                    .position
                    .as_ref()
                    .map(|p| (p.left, p.right, p.level)),
            )
            .field("placed", &self.placed)
            .field("operations", &self.operations)
            .finish()
    }
}

impl<M> PendingNode<M>
where
    M: NestedSetModel,
{
    /// Wrap a fresh ActiveModel; it will be inserted on save.
    pub fn new(active: M::ActiveModel) -> Self {
        Self {
            active,
            existing: None,
            scope: None,
            position: None,
            placed: false,
            operations: Vec::new(),
        }
    }

    /// Wrap a persisted model; it will be updated on save.
    ///
    /// The tree columns of a row that is already in a tree are left alone by
    /// the update, so a model loaded before other rows shifted can still be
    /// saved safely.
    pub fn from_model(model: M) -> Self {
        let position = model.is_in_tree().then(|| TreePosition {
            left: model.left(),
            right: model.right(),
            level: model.level(),
            scope: model.scope(),
        });

        Self {
            active: model.clone().into_active_model(),
            scope: model.scope(),
            existing: Some(model),
            position,
            placed: false,
            operations: Vec::new(),
        }
    }

    pub fn active(&self) -> &M::ActiveModel {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut M::ActiveModel {
        &mut self.active
    }

    pub fn existing(&self) -> Option<&M> {
        self.existing.as_ref()
    }

    pub fn position(&self) -> Option<&TreePosition<M::Scope>> {
        self.position.as_ref()
    }

    pub fn scope(&self) -> Option<&M::Scope> {
        self.scope.as_ref()
    }

    pub fn pending_operations(&self) -> &[PendingOperation<M>] {
        &self.operations
    }

    pub fn is_in_tree(&self) -> bool {
        self.position.is_some()
    }

    pub fn is_root(&self) -> bool {
        self.position.as_ref().is_some_and(TreePosition::is_root)
    }

    /// Choose the tree a future root belongs to. Only meaningful for scoped
    /// models; children and siblings take the scope of their reference node.
    pub fn set_scope(&mut self, scope: M::Scope) -> Result<&mut Self, NestedSetError> {
        if self.is_in_tree() {
            return Err(NestedSetError::CrossScope);
        }
        self.scope = Some(scope);
        Ok(self)
    }

    pub fn make_root(&mut self) -> Result<&mut Self, NestedSetError> {
        if self.is_in_tree() {
            return Err(NestedSetError::InvalidRootMutation);
        }
        if M::use_scope() && self.scope.is_none() {
            return Err(NestedSetError::MissingScope);
        }

        self.position = Some(TreePosition {
            left: 1,
            right: 2,
            level: 0,
            scope: self.scope.clone(),
        });
        self.placed = true;
        Ok(self)
    }

    pub fn insert_as_first_child_of(&mut self, parent: &M) -> Result<&mut Self, NestedSetError> {
        self.insert_at(
            parent,
            "move_to_first_child_of",
            parent.left() + 1,
            parent.level() + 1,
        )
    }

    pub fn insert_as_last_child_of(&mut self, parent: &M) -> Result<&mut Self, NestedSetError> {
        self.insert_at(
            parent,
            "move_to_last_child_of",
            parent.right(),
            parent.level() + 1,
        )
    }

    pub fn insert_as_prev_sibling_of(&mut self, sibling: &M) -> Result<&mut Self, NestedSetError> {
        self.insert_at(
            sibling,
            "move_to_prev_sibling_of",
            sibling.left(),
            sibling.level(),
        )
    }

    pub fn insert_as_next_sibling_of(&mut self, sibling: &M) -> Result<&mut Self, NestedSetError> {
        self.insert_at(
            sibling,
            "move_to_next_sibling_of",
            sibling.right() + 1,
            sibling.level(),
        )
    }

    fn insert_at(
        &mut self,
        reference: &M,
        suggestion: &'static str,
        left: i32,
        level: i32,
    ) -> Result<&mut Self, NestedSetError> {
        if self.is_in_tree() {
            return Err(NestedSetError::AlreadyInTree { suggestion });
        }
        if !reference.is_in_tree() {
            return Err(NestedSetError::not_in_tree(
                "reference node",
                "receive an insertion",
            ));
        }

        let scope = reference.scope();
        self.scope = scope.clone();
        self.position = Some(TreePosition::leaf_at(left, level, scope.clone()));
        self.placed = true;
        self.operations.push(PendingOperation::MakeRoomForLeaf {
            left,
            scope,
            exclude: self.existing.as_ref().map(M::id),
        });
        Ok(self)
    }

    /// True when saving must check that no other root exists in the tree.
    pub(crate) fn becomes_root(&self) -> bool {
        self.placed && self.is_root()
    }

    /// Coordinates to write on save: only those assigned since loading.
    pub(crate) fn into_parts(self) -> PendingParts<M> {
        let placed = self.placed;
        PendingParts {
            active: self.active,
            existing: self.existing,
            scope: self.scope,
            position: self.position.filter(|_| placed),
            operations: self.operations,
        }
    }
}

pub(crate) struct PendingParts<M>
where
    M: NestedSetModel,
{
    pub active: M::ActiveModel,
    pub existing: Option<M>,
    pub scope: Option<M::Scope>,
    pub position: Option<TreePosition<M::Scope>>,
    pub operations: Vec<PendingOperation<M>>,
}

use sea_orm::ConnectionTrait;

use crate::error::NestedSetError;
use crate::repository::NestedSetRepository;
use crate::traits::NestedSetModel;

/// A loaded model together with lazily fetched parent and children.
///
/// The caches only save queries within one unit of work. They are dropped
/// whenever the model may change: on [`TreeNode::model_mut`],
/// [`TreeNode::reload`] and [`TreeNode::clear_references`].
#[derive(Clone, Debug)]
pub struct TreeNode<M>
where
    M: NestedSetModel,
{
    model: M,
    parent: Option<M>,
    children: Option<Vec<M>>,
}

impl<M> TreeNode<M>
where
    M: NestedSetModel,
{
    pub fn new(model: M) -> Self {
        Self {
            model,
            parent: None,
            children: None,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable access for repository operations; clears both caches.
    pub fn model_mut(&mut self) -> &mut M {
        self.clear_references();
        &mut self.model
    }

    pub fn into_inner(self) -> M {
        self.model
    }

    pub async fn parent<C: ConnectionTrait>(
        &mut self,
        conn: &C,
    ) -> Result<Option<&M>, NestedSetError> {
        if self.parent.is_none() && self.model.has_parent() {
            self.parent = NestedSetRepository::<M>::new()
                .parent(conn, &self.model)
                .await?;
        }
        Ok(self.parent.as_ref())
    }

    /// Set the cached parent. This does not move the node.
    pub fn set_parent(&mut self, parent: Option<M>) {
        self.parent = parent;
    }

    pub async fn children<C: ConnectionTrait>(&mut self, conn: &C) -> Result<&[M], NestedSetError> {
        let children = match self.children.take() {
            Some(children) => children,
            None => {
                NestedSetRepository::<M>::new()
                    .children(conn, &self.model)
                    .await?
            }
        };
        Ok(self.children.insert(children).as_slice())
    }

    pub async fn count_children<C: ConnectionTrait>(&self, conn: &C) -> Result<u64, NestedSetError> {
        match &self.children {
            Some(children) => Ok(children.len() as u64),
            None => {
                NestedSetRepository::<M>::new()
                    .count_children(conn, &self.model)
                    .await
            }
        }
    }

    /// Add a child to the cache without touching storage, for hydrating a
    /// tree loaded in one query.
    pub fn add_child_to_cache(&mut self, child: M) {
        let children = self.children.get_or_insert_with(Vec::new);
        if !children.iter().any(|existing| existing.id() == child.id()) {
            children.push(child);
        }
    }

    pub fn clear_children(&mut self) {
        self.children = None;
    }

    pub fn clear_references(&mut self) {
        self.parent = None;
        self.children = None;
    }

    /// Re-read the model and drop the caches.
    pub async fn reload<C: ConnectionTrait>(&mut self, conn: &C) -> Result<(), NestedSetError> {
        NestedSetRepository::<M>::new()
            .reload(conn, self.model_mut())
            .await
    }
}

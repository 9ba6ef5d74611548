//! Bulk rewrites of the left/right/level columns.
//!
//! These are the only statements that move existing nodes around. Each one is
//! a single `UPDATE` per column, so their cost grows with the number of rows
//! to the right of the pivot. Callers run them inside a transaction.

use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait};

use crate::error::NestedSetError;
use crate::query::NestedSetQuery;
use crate::traits::NestedSetModel;

/// Add `delta` to every left value and every right value that is `>= first`
/// (and `<= last` when given).
///
/// The two bounds are shifted independently: a node whose left edge lies
/// before `first` but whose right edge lies after it grows or shrinks, which
/// is how ancestors of the pivot absorb an insertion or a removal.
pub async fn shift_rl_values<M, C>(
    conn: &C,
    delta: i32,
    first: i32,
    last: Option<i32>,
    scope: Option<&M::Scope>,
    exclude: Option<&M::Id>,
) -> Result<(), NestedSetError>
where
    M: NestedSetModel,
    C: ConnectionTrait,
{
    debug!(
        "shift {} left/right by {delta} from {first} to {last:?}",
        M::nested_set_config().table_name()
    );

    for column in [M::left_column(), M::right_column()] {
        let mut query = NestedSetQuery::<M>::new()
            .filter(column.gte(first))
            .in_tree(scope);
        if let Some(last) = last {
            query = query.filter(column.lte(last));
        }
        if let Some(id) = exclude {
            query = query.filter(M::id_column().ne(M::id_to_value(id)));
        }

        query
            .update(conn, column, Expr::col(column).add(delta))
            .await?;
    }

    Ok(())
}

/// Add `delta` to the level of every node whose interval lies within
/// `[first, last]`.
pub async fn shift_level<M, C>(
    conn: &C,
    delta: i32,
    first: i32,
    last: i32,
    scope: Option<&M::Scope>,
) -> Result<(), NestedSetError>
where
    M: NestedSetModel,
    C: ConnectionTrait,
{
    debug!(
        "shift {} level by {delta} within [{first}, {last}]",
        M::nested_set_config().table_name()
    );

    let column = M::level_column();
    NestedSetQuery::<M>::new()
        .filter(M::left_column().gte(first))
        .filter(M::right_column().lte(last))
        .in_tree(scope)
        .update(conn, column, Expr::col(column).add(delta))
        .await?;

    Ok(())
}

/// Open a two-wide gap at `left` for a new leaf.
///
/// `exclude` keeps a row that is being re-saved in place out of the shift.
pub async fn make_room_for_leaf<M, C>(
    conn: &C,
    left: i32,
    scope: Option<&M::Scope>,
    exclude: Option<&M::Id>,
) -> Result<(), NestedSetError>
where
    M: NestedSetModel,
    C: ConnectionTrait,
{
    shift_rl_values::<M, C>(conn, 2, left, None, scope, exclude).await
}

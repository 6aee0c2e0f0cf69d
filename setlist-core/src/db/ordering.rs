//! Ordered-sibling relocation.
//!
//! Sets within a workout and exercises within a set share the same shape: a
//! parent column, a child column and an order column with a unique index on
//! `(parent, order)`. SQLite checks that index after every statement, so no
//! single UPDATE may ever leave two siblings on the same slot. The routines
//! here step around that with a sentinel slot (single moves) or a disjoint
//! offset band (bulk reorders). All of them take the caller's open
//! transaction and never commit on their own.

use std::collections::HashSet;

use log::debug;
use sqlx::SqliteConnection;

use crate::db::models::Position;
use crate::db::now_millis;
use crate::error::{StoreError, StoreResult};
use crate::validation::SiblingOrdering;

/// Parking slot for a row mid-swap. Real orders are always >= 1.
pub const SENTINEL_ORDER: i64 = -1;

/// Lower bound of the staging band used by bulk reorders.
pub const REORDER_OFFSET: i64 = 1000;

/// Describes one ordered child table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderedTable {
    pub table: &'static str,
    pub parent_column: &'static str,
    pub child_column: &'static str,
    pub order_column: &'static str,
    pub child_label: &'static str,
    pub parent_label: &'static str,
}

pub const SETS: OrderedTable = OrderedTable {
    table: "sets",
    parent_column: "workout_id",
    child_column: "id",
    order_column: "set_order",
    child_label: "Set",
    parent_label: "workout",
};

pub const SET_EXERCISES: OrderedTable = OrderedTable {
    table: "set_exercises",
    parent_column: "set_id",
    child_column: "exercise_id",
    order_column: "exercise_order",
    child_label: "Exercise",
    parent_label: "set",
};

/// Where a displaced sibling ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    /// After every other sibling.
    Tail,
    /// A specific slot, normally the one the mover vacated.
    Slot(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Unchanged,
    Direct,
    Swapped { with: i64 },
}

impl OrderedTable {
    fn not_in_parent(&self, parent: i64, child: i64) -> StoreError {
        StoreError::NotFound(format!(
            "{} {} not found in {} {}",
            self.child_label, child, self.parent_label, parent
        ))
    }

    fn out_of_range(&self, parent: i64) -> StoreError {
        StoreError::Rule(format!(
            "{} orders in {} {} are out of range",
            self.child_label, self.parent_label, parent
        ))
    }

    /// The child currently holding `order`, if any.
    pub async fn occupant(
        &self,
        conn: &mut SqliteConnection,
        parent: i64,
        order: i64,
    ) -> StoreResult<Option<i64>> {
        let sql = format!(
            "SELECT {c} FROM {t} WHERE {p} = ?1 AND {o} = ?2",
            c = self.child_column,
            t = self.table,
            p = self.parent_column,
            o = self.order_column
        );
        Ok(sqlx::query_scalar(&sql)
            .bind(parent)
            .bind(order)
            .fetch_optional(&mut *conn)
            .await?)
    }

    pub async fn current_order(
        &self,
        conn: &mut SqliteConnection,
        parent: i64,
        child: i64,
    ) -> StoreResult<Option<i64>> {
        let sql = format!(
            "SELECT {o} FROM {t} WHERE {p} = ?1 AND {c} = ?2",
            o = self.order_column,
            t = self.table,
            p = self.parent_column,
            c = self.child_column
        );
        Ok(sqlx::query_scalar(&sql)
            .bind(parent)
            .bind(child)
            .fetch_optional(&mut *conn)
            .await?)
    }

    async fn children(&self, conn: &mut SqliteConnection, parent: i64) -> StoreResult<HashSet<i64>> {
        let sql = format!(
            "SELECT {c} FROM {t} WHERE {p} = ?1",
            c = self.child_column,
            t = self.table,
            p = self.parent_column
        );
        let ids: Vec<i64> = sqlx::query_scalar(&sql)
            .bind(parent)
            .fetch_all(&mut *conn)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn max_order(&self, conn: &mut SqliteConnection, parent: i64) -> StoreResult<i64> {
        let sql = format!(
            "SELECT COALESCE(MAX({o}), 0) FROM {t} WHERE {p} = ?1",
            o = self.order_column,
            t = self.table,
            p = self.parent_column
        );
        Ok(sqlx::query_scalar(&sql)
            .bind(parent)
            .fetch_one(&mut *conn)
            .await?)
    }

    /// First slot past the end of the placed siblings. Rows parked on the
    /// sentinel are not counted. With a dense sequence this is `count + 1`;
    /// after deletions left gaps it moves past the highest order instead so
    /// it can never land on an occupied slot.
    pub async fn tail_order(&self, conn: &mut SqliteConnection, parent: i64) -> StoreResult<i64> {
        let sql = format!(
            "SELECT COUNT(*), COALESCE(MAX({o}), 0) FROM {t} WHERE {p} = ?1 AND {o} > 0",
            o = self.order_column,
            t = self.table,
            p = self.parent_column
        );
        let (count, max): (i64, i64) = sqlx::query_as(&sql)
            .bind(parent)
            .fetch_one(&mut *conn)
            .await?;
        count
            .max(max)
            .checked_add(1)
            .ok_or_else(|| self.out_of_range(parent))
    }

    /// Write the order of one child and refresh its `updated_at`.
    pub async fn write_order(
        &self,
        conn: &mut SqliteConnection,
        parent: i64,
        child: i64,
        order: i64,
    ) -> StoreResult<()> {
        let sql = format!(
            "UPDATE {t} SET {o} = ?1, updated_at = ?2 WHERE {p} = ?3 AND {c} = ?4",
            t = self.table,
            o = self.order_column,
            p = self.parent_column,
            c = self.child_column
        );
        let result = sqlx::query(&sql)
            .bind(order)
            .bind(now_millis())
            .bind(parent)
            .bind(child)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(self.not_in_parent(parent, child));
        }
        Ok(())
    }

    async fn stage_order(
        &self,
        conn: &mut SqliteConnection,
        parent: i64,
        child: i64,
        order: i64,
    ) -> StoreResult<()> {
        let sql = format!(
            "UPDATE {t} SET {o} = ?1 WHERE {p} = ?2 AND {c} = ?3",
            t = self.table,
            o = self.order_column,
            p = self.parent_column,
            c = self.child_column
        );
        sqlx::query(&sql)
            .bind(order)
            .bind(parent)
            .bind(child)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

/// Free `target` for an incoming child by parking its occupant on the
/// sentinel. Returns the parked child so the caller can [`land`] it once the
/// new row is in place.
pub async fn vacate(
    conn: &mut SqliteConnection,
    table: &OrderedTable,
    parent: i64,
    target: i64,
) -> StoreResult<Option<i64>> {
    let Some(occupant) = table.occupant(conn, parent, target).await? else {
        return Ok(None);
    };
    debug!(
        "{}: parking {} {} from slot {} in {} {}",
        table.table, table.child_label, occupant, target, table.parent_label, parent
    );
    table
        .write_order(conn, parent, occupant, SENTINEL_ORDER)
        .await?;
    Ok(Some(occupant))
}

/// Move a parked child off the sentinel. Returns the order it landed on.
pub async fn land(
    conn: &mut SqliteConnection,
    table: &OrderedTable,
    parent: i64,
    child: i64,
    landing: Landing,
) -> StoreResult<i64> {
    let order = match landing {
        Landing::Tail => table.tail_order(conn, parent).await?,
        Landing::Slot(order) => order,
    };
    debug!(
        "{}: landing {} {} on slot {} in {} {}",
        table.table, table.child_label, child, order, table.parent_label, parent
    );
    table.write_order(conn, parent, child, order).await?;
    Ok(order)
}

/// Move an existing child to `target` within its parent. An occupant of the
/// target swaps into the slot the child vacated; nobody else moves.
pub async fn move_within(
    conn: &mut SqliteConnection,
    table: &OrderedTable,
    parent: i64,
    child: i64,
    target: i64,
) -> StoreResult<Move> {
    let current = table
        .current_order(conn, parent, child)
        .await?
        .ok_or_else(|| table.not_in_parent(parent, child))?;
    if current == target {
        return Ok(Move::Unchanged);
    }

    match table.occupant(conn, parent, target).await? {
        None => {
            table.write_order(conn, parent, child, target).await?;
            Ok(Move::Direct)
        }
        Some(other) => {
            debug!(
                "{}: swapping {} {} (slot {}) with {} (slot {}) in {} {}",
                table.table,
                table.child_label,
                child,
                current,
                other,
                target,
                table.parent_label,
                parent
            );
            table
                .write_order(conn, parent, child, SENTINEL_ORDER)
                .await?;
            land(conn, table, parent, other, Landing::Slot(current)).await?;
            table.write_order(conn, parent, child, target).await?;
            Ok(Move::Swapped { with: other })
        }
    }
}

/// Apply a new ordering for some or all children of one parent.
///
/// Pass one stages every listed child into a band above any order in use,
/// pass two writes the real orders. Listed children therefore never collide
/// with each other. A final order that lands on an unlisted sibling still
/// trips the unique index and the caller's transaction fails as a whole.
pub async fn apply_ordering(
    conn: &mut SqliteConnection,
    table: &OrderedTable,
    ordering: &SiblingOrdering,
) -> StoreResult<Vec<Position>> {
    let parent = ordering.parent_id;
    let known = table.children(conn, parent).await?;
    if let Some(missing) = ordering.items.iter().find(|i| !known.contains(&i.child_id)) {
        return Err(table.not_in_parent(parent, missing.child_id));
    }

    let offset = table
        .max_order(conn, parent)
        .await?
        .checked_add(1)
        .map(|past_end| REORDER_OFFSET.max(past_end))
        .ok_or_else(|| table.out_of_range(parent))?;
    debug!(
        "{}: reordering {} children of {} {} through offset {}",
        table.table,
        ordering.items.len(),
        table.parent_label,
        parent,
        offset
    );

    for item in &ordering.items {
        let staged = item
            .order
            .checked_add(offset)
            .ok_or_else(|| table.out_of_range(parent))?;
        table
            .stage_order(conn, parent, item.child_id, staged)
            .await?;
    }

    let mut positions = Vec::with_capacity(ordering.items.len());
    for item in &ordering.items {
        table
            .write_order(conn, parent, item.child_id, item.order)
            .await?;
        positions.push(Position {
            id: item.child_id,
            order: item.order,
        });
    }
    Ok(positions)
}

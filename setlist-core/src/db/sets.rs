use log::{debug, info};
use sqlx::{SqliteConnection, SqlitePool};

use crate::db::models::{EntityRef, Reordered, Set, display_set_name};
use crate::db::now_millis;
use crate::db::ordering::{self, Landing, Move, SETS};
use crate::error::{StoreError, StoreResult};
use crate::validation::{SetFields, SiblingOrdering};

const SET_COLUMNS: &str =
    "id, workout_id, name, description, set_order, rest_time, created_at, updated_at";

async fn ensure_workout(conn: &mut SqliteConnection, workout_id: i64) -> StoreResult<()> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM workouts WHERE id = ?1")
        .bind(workout_id)
        .fetch_optional(&mut *conn)
        .await?;
    exists
        .map(|_| ())
        .ok_or_else(|| StoreError::not_found("Workout", workout_id))
}

async fn fetch_set(conn: &mut SqliteConnection, set_id: i64) -> StoreResult<Set> {
    sqlx::query_as::<_, Set>(&format!("SELECT {} FROM sets WHERE id = ?1", SET_COLUMNS))
        .bind(set_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| StoreError::not_found("Set", set_id))
}

/// Insert a set at `fields.set_order`. A sibling already on that slot is
/// appended to the end of the workout.
pub async fn create_set(pool: &SqlitePool, fields: &SetFields) -> StoreResult<Set> {
    let mut tx = pool.begin().await?;
    ensure_workout(&mut tx, fields.workout_id).await?;

    let displaced = ordering::vacate(&mut tx, &SETS, fields.workout_id, fields.set_order).await?;

    let now = now_millis();
    let set = sqlx::query_as::<_, Set>(&format!(
        "INSERT INTO sets (workout_id, name, description, set_order, rest_time, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
         RETURNING {}",
        SET_COLUMNS
    ))
    .bind(fields.workout_id)
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(fields.set_order)
    .bind(fields.rest_time)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(sibling) = displaced {
        let landed = ordering::land(&mut tx, &SETS, set.workout_id, sibling, Landing::Tail).await?;
        info!(
            "Set {} took slot {} in workout {}, set {} appended at {}",
            set.id, set.set_order, set.workout_id, sibling, landed
        );
    }

    tx.commit().await?;
    Ok(set)
}

/// Update a set's fields and move it to `fields.set_order`.
///
/// Within the same workout an occupant of the target slot swaps into the
/// slot this set leaves. Moving to another workout behaves like a create
/// there: the occupant is appended to the end.
pub async fn update_set(pool: &SqlitePool, set_id: i64, fields: &SetFields) -> StoreResult<Set> {
    let mut tx = pool.begin().await?;
    let current = fetch_set(&mut tx, set_id).await?;

    if current.workout_id == fields.workout_id {
        let moved =
            ordering::move_within(&mut tx, &SETS, current.workout_id, set_id, fields.set_order)
                .await?;
        if let Move::Swapped { with } = moved {
            info!(
                "Set {} moved {} -> {}, set {} took slot {}",
                set_id, current.set_order, fields.set_order, with, current.set_order
            );
        }
    } else {
        ensure_workout(&mut tx, fields.workout_id).await?;
        let displaced =
            ordering::vacate(&mut tx, &SETS, fields.workout_id, fields.set_order).await?;
        sqlx::query("UPDATE sets SET workout_id = ?1, set_order = ?2 WHERE id = ?3")
            .bind(fields.workout_id)
            .bind(fields.set_order)
            .bind(set_id)
            .execute(&mut *tx)
            .await?;
        if let Some(sibling) = displaced {
            ordering::land(&mut tx, &SETS, fields.workout_id, sibling, Landing::Tail).await?;
        }
        debug!(
            "Set {} moved from workout {} to {}",
            set_id, current.workout_id, fields.workout_id
        );
    }

    let updated = sqlx::query_as::<_, Set>(&format!(
        "UPDATE sets SET name = ?1, description = ?2, rest_time = ?3, updated_at = ?4
         WHERE id = ?5
         RETURNING {}",
        SET_COLUMNS
    ))
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(fields.rest_time)
    .bind(now_millis())
    .bind(set_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(updated)
}

/// Deletes the set and its exercise links. Remaining sets keep their orders.
pub async fn delete_set(pool: &SqlitePool, set_id: i64) -> StoreResult<EntityRef> {
    let deleted: Option<(i64, String, i64)> =
        sqlx::query_as("DELETE FROM sets WHERE id = ?1 RETURNING id, name, set_order")
            .bind(set_id)
            .fetch_optional(pool)
            .await?;
    let (id, name, set_order) = deleted.ok_or_else(|| StoreError::not_found("Set", set_id))?;
    debug!("Deleted set {} at slot {}", id, set_order);
    Ok(EntityRef {
        id,
        name: display_set_name(&name, set_order),
    })
}

/// Apply a new set ordering for one workout in a single transaction.
pub async fn reorder_sets(pool: &SqlitePool, ordering: &SiblingOrdering) -> StoreResult<Reordered> {
    let mut tx = pool.begin().await?;
    ensure_workout(&mut tx, ordering.parent_id).await?;
    let positions = ordering::apply_ordering(&mut tx, &SETS, ordering).await?;
    tx.commit().await?;
    info!(
        "Reordered {} sets in workout {}",
        positions.len(),
        ordering.parent_id
    );
    Ok(Reordered {
        parent_id: ordering.parent_id,
        positions,
    })
}

use log::{debug, info};
use sqlx::{SqliteConnection, SqlitePool};

use crate::db::models::{EntityRef, Exercise, ExerciseOrderChange, Reordered};
use crate::db::now_millis;
use crate::db::ordering::{self, Landing, Move, SET_EXERCISES};
use crate::error::{StoreError, StoreResult};
use crate::validation::{ExerciseFields, Placement, SiblingOrdering};

const EXERCISE_COLUMNS: &str =
    "id, name, description, image_url, reps, duration, created_at, updated_at";

pub const EXERCISE_IN_USE: &str = "Cannot delete: exercise is assigned to one or more sets.";
pub const EXERCISE_NOT_IN_SET: &str = "Exercise not found in set.";

async fn ensure_set(conn: &mut SqliteConnection, set_id: i64) -> StoreResult<()> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM sets WHERE id = ?1")
        .bind(set_id)
        .fetch_optional(&mut *conn)
        .await?;
    exists
        .map(|_| ())
        .ok_or_else(|| StoreError::not_found("Set", set_id))
}

/// Link an exercise into a set at `placement`, appending any occupant of
/// that slot to the end of the set.
async fn link_into_set(
    conn: &mut SqliteConnection,
    exercise_id: i64,
    placement: Placement,
) -> StoreResult<()> {
    ensure_set(conn, placement.set_id).await?;
    let displaced = ordering::vacate(
        conn,
        &SET_EXERCISES,
        placement.set_id,
        placement.exercise_order,
    )
    .await?;

    let now = now_millis();
    sqlx::query(
        "INSERT INTO set_exercises (set_id, exercise_id, exercise_order, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
    )
    .bind(placement.set_id)
    .bind(exercise_id)
    .bind(placement.exercise_order)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if let Some(sibling) = displaced {
        let landed =
            ordering::land(conn, &SET_EXERCISES, placement.set_id, sibling, Landing::Tail).await?;
        info!(
            "Exercise {} took slot {} in set {}, exercise {} appended at {}",
            exercise_id, placement.exercise_order, placement.set_id, sibling, landed
        );
    }
    Ok(())
}

pub async fn create_exercise(pool: &SqlitePool, fields: &ExerciseFields) -> StoreResult<Exercise> {
    let mut tx = pool.begin().await?;
    let now = now_millis();
    let exercise = sqlx::query_as::<_, Exercise>(&format!(
        "INSERT INTO exercises (name, description, image_url, reps, duration, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
         RETURNING {}",
        EXERCISE_COLUMNS
    ))
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(&fields.image_url)
    .bind(fields.reps)
    .bind(fields.duration)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(placement) = fields.placement {
        link_into_set(&mut tx, exercise.id, placement).await?;
    }

    tx.commit().await?;
    debug!("Created exercise {} ({})", exercise.id, exercise.name);
    Ok(exercise)
}

/// Update an exercise. With a placement, an exercise already in that set is
/// moved with swap semantics; otherwise it is linked like a fresh insert.
pub async fn update_exercise(
    pool: &SqlitePool,
    exercise_id: i64,
    fields: &ExerciseFields,
) -> StoreResult<Exercise> {
    let mut tx = pool.begin().await?;
    let exercise = sqlx::query_as::<_, Exercise>(&format!(
        "UPDATE exercises
         SET name = ?1, description = ?2, image_url = ?3, reps = ?4, duration = ?5, updated_at = ?6
         WHERE id = ?7
         RETURNING {}",
        EXERCISE_COLUMNS
    ))
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(&fields.image_url)
    .bind(fields.reps)
    .bind(fields.duration)
    .bind(now_millis())
    .bind(exercise_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| StoreError::not_found("Exercise", exercise_id))?;

    if let Some(placement) = fields.placement {
        let linked = SET_EXERCISES
            .current_order(&mut tx, placement.set_id, exercise_id)
            .await?;
        if linked.is_some() {
            ordering::move_within(
                &mut tx,
                &SET_EXERCISES,
                placement.set_id,
                exercise_id,
                placement.exercise_order,
            )
            .await?;
        } else {
            link_into_set(&mut tx, exercise_id, placement).await?;
        }
    }

    tx.commit().await?;
    Ok(exercise)
}

/// Delete an exercise that no set uses any more.
pub async fn delete_exercise(pool: &SqlitePool, exercise_id: i64) -> StoreResult<EntityRef> {
    let mut tx = pool.begin().await?;
    let name: Option<String> = sqlx::query_scalar("SELECT name FROM exercises WHERE id = ?1")
        .bind(exercise_id)
        .fetch_optional(&mut *tx)
        .await?;
    let name = name.ok_or_else(|| StoreError::not_found("Exercise", exercise_id))?;

    let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM set_exercises WHERE exercise_id = ?1")
        .bind(exercise_id)
        .fetch_one(&mut *tx)
        .await?;
    if links > 0 {
        debug!("Exercise {} still linked to {} sets", exercise_id, links);
        return Err(StoreError::Rule(EXERCISE_IN_USE.to_string()));
    }

    sqlx::query("DELETE FROM exercises WHERE id = ?1")
        .bind(exercise_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(EntityRef {
        id: exercise_id,
        name,
    })
}

pub async fn get_exercise(pool: &SqlitePool, exercise_id: i64) -> StoreResult<Option<Exercise>> {
    Ok(sqlx::query_as::<_, Exercise>(&format!(
        "SELECT {} FROM exercises WHERE id = ?1",
        EXERCISE_COLUMNS
    ))
    .bind(exercise_id)
    .fetch_optional(pool)
    .await?)
}

pub async fn get_all_exercises(pool: &SqlitePool) -> StoreResult<Vec<Exercise>> {
    Ok(sqlx::query_as::<_, Exercise>(&format!(
        "SELECT {} FROM exercises ORDER BY name, id",
        EXERCISE_COLUMNS
    ))
    .fetch_all(pool)
    .await?)
}

/// Move one exercise to `new_order` inside a set, swapping with whichever
/// exercise held that slot.
pub async fn update_exercise_order_in_set(
    pool: &SqlitePool,
    set_id: i64,
    exercise_id: i64,
    new_order: i64,
) -> StoreResult<ExerciseOrderChange> {
    let mut tx = pool.begin().await?;
    if SET_EXERCISES
        .current_order(&mut tx, set_id, exercise_id)
        .await?
        .is_none()
    {
        return Err(StoreError::NotFound(EXERCISE_NOT_IN_SET.to_string()));
    }
    let moved = ordering::move_within(&mut tx, &SET_EXERCISES, set_id, exercise_id, new_order).await?;
    tx.commit().await?;

    if let Move::Swapped { with } = moved {
        info!(
            "Exercise {} moved to slot {} in set {}, swapped with {}",
            exercise_id, new_order, set_id, with
        );
    }
    Ok(ExerciseOrderChange {
        id: exercise_id,
        new_order,
    })
}

/// Remove an exercise from a set. Other exercises keep their orders.
pub async fn unlink_exercise_from_set(
    pool: &SqlitePool,
    set_id: i64,
    exercise_id: i64,
) -> StoreResult<EntityRef> {
    let mut tx = pool.begin().await?;
    let removed = sqlx::query("DELETE FROM set_exercises WHERE set_id = ?1 AND exercise_id = ?2")
        .bind(set_id)
        .bind(exercise_id)
        .execute(&mut *tx)
        .await?;
    if removed.rows_affected() == 0 {
        return Err(StoreError::NotFound(EXERCISE_NOT_IN_SET.to_string()));
    }
    let name: String = sqlx::query_scalar("SELECT name FROM exercises WHERE id = ?1")
        .bind(exercise_id)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(EntityRef {
        id: exercise_id,
        name,
    })
}

pub async fn reorder_set_exercises(
    pool: &SqlitePool,
    ordering: &SiblingOrdering,
) -> StoreResult<Reordered> {
    let mut tx = pool.begin().await?;
    ensure_set(&mut tx, ordering.parent_id).await?;
    let positions = ordering::apply_ordering(&mut tx, &SET_EXERCISES, ordering).await?;
    tx.commit().await?;
    info!(
        "Reordered {} exercises in set {}",
        positions.len(),
        ordering.parent_id
    );
    Ok(Reordered {
        parent_id: ordering.parent_id,
        positions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::*;
    use crate::validation::OrderItem;

    fn fields(name: &str, placement: Option<(i64, i64)>) -> ExerciseFields {
        ExerciseFields {
            name: name.to_string(),
            description: None,
            image_url: None,
            reps: Some(12),
            duration: None,
            placement: placement.map(|(set_id, exercise_order)| Placement {
                set_id,
                exercise_order,
            }),
        }
    }

    #[tokio::test]
    async fn create_with_placement_appends_occupant() {
        let pool = pool().await;
        let w = workout(&pool, "Legs").await;
        let s = set_at(&pool, w, "A", 1).await;
        let squat = exercise(&pool, "Squat").await;
        let lunge = exercise(&pool, "Lunge").await;
        link(&pool, s, squat, 1).await;
        link(&pool, s, lunge, 2).await;

        let created = create_exercise(&pool, &fields("Deadlift", Some((s, 1))))
            .await
            .unwrap();
        assert_eq!(
            exercise_orders(&pool, s).await,
            vec![(squat, 3), (lunge, 2), (created.id, 1)]
        );
    }

    #[tokio::test]
    async fn create_into_missing_set_rolls_back() {
        let pool = pool().await;
        let err = create_exercise(&pool, &fields("Deadlift", Some((5, 1))))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(get_all_exercises(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_within_same_set_swaps() {
        let pool = pool().await;
        let w = workout(&pool, "Legs").await;
        let s = set_at(&pool, w, "A", 1).await;
        let squat = exercise(&pool, "Squat").await;
        let lunge = exercise(&pool, "Lunge").await;
        link(&pool, s, squat, 1).await;
        link(&pool, s, lunge, 2).await;

        let updated = update_exercise(&pool, squat, &fields("Front squat", Some((s, 2))))
            .await
            .unwrap();
        assert_eq!(updated.name, "Front squat");
        assert_eq!(exercise_orders(&pool, s).await, vec![(squat, 2), (lunge, 1)]);
    }

    #[tokio::test]
    async fn update_into_new_set_links_it() {
        let pool = pool().await;
        let w = workout(&pool, "Legs").await;
        let s = set_at(&pool, w, "A", 1).await;
        let squat = exercise(&pool, "Squat").await;
        let lunge = exercise(&pool, "Lunge").await;
        link(&pool, s, lunge, 1).await;

        update_exercise(&pool, squat, &fields("Squat", Some((s, 1))))
            .await
            .unwrap();
        assert_eq!(exercise_orders(&pool, s).await, vec![(squat, 1), (lunge, 2)]);
    }

    #[tokio::test]
    async fn delete_is_refused_while_linked() {
        let pool = pool().await;
        let w = workout(&pool, "Legs").await;
        let s = set_at(&pool, w, "A", 1).await;
        let squat = exercise(&pool, "Squat").await;
        let lunge = exercise(&pool, "Lunge").await;
        link(&pool, s, squat, 1).await;

        let err = delete_exercise(&pool, squat).await.unwrap_err();
        assert_eq!(err.to_string(), EXERCISE_IN_USE);
        assert!(get_exercise(&pool, squat).await.unwrap().is_some());

        let deleted = delete_exercise(&pool, lunge).await.unwrap();
        assert_eq!(deleted.name, "Lunge");
        assert!(get_exercise(&pool, lunge).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn order_in_set_requires_link() {
        let pool = pool().await;
        let w = workout(&pool, "Legs").await;
        let s = set_at(&pool, w, "A", 1).await;
        let squat = exercise(&pool, "Squat").await;

        let err = update_exercise_order_in_set(&pool, s, squat, 2)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), EXERCISE_NOT_IN_SET);
    }

    #[tokio::test]
    async fn order_in_set_to_same_slot_is_a_no_op() {
        let pool = pool().await;
        let w = workout(&pool, "Legs").await;
        let s = set_at(&pool, w, "A", 1).await;
        let squat = exercise(&pool, "Squat").await;
        link(&pool, s, squat, 3).await;

        let change = update_exercise_order_in_set(&pool, s, squat, 3).await.unwrap();
        assert_eq!(change, ExerciseOrderChange { id: squat, new_order: 3 });
        assert_eq!(exercise_orders(&pool, s).await, vec![(squat, 3)]);
    }

    #[tokio::test]
    async fn unlink_leaves_gap() {
        let pool = pool().await;
        let w = workout(&pool, "Legs").await;
        let s = set_at(&pool, w, "A", 1).await;
        let squat = exercise(&pool, "Squat").await;
        let lunge = exercise(&pool, "Lunge").await;
        link(&pool, s, squat, 1).await;
        link(&pool, s, lunge, 2).await;

        unlink_exercise_from_set(&pool, s, squat).await.unwrap();
        assert_eq!(exercise_orders(&pool, s).await, vec![(lunge, 2)]);
        assert!(matches!(
            unlink_exercise_from_set(&pool, s, squat).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn reorder_exercises_in_set() {
        let pool = pool().await;
        let w = workout(&pool, "Legs").await;
        let s = set_at(&pool, w, "A", 1).await;
        let squat = exercise(&pool, "Squat").await;
        let lunge = exercise(&pool, "Lunge").await;
        link(&pool, s, squat, 1).await;
        link(&pool, s, lunge, 2).await;

        let ordering = SiblingOrdering {
            parent_id: s,
            items: vec![
                OrderItem { child_id: squat, order: 2 },
                OrderItem { child_id: lunge, order: 1 },
            ],
        };
        reorder_set_exercises(&pool, &ordering).await.unwrap();
        assert_eq!(exercise_orders(&pool, s).await, vec![(squat, 2), (lunge, 1)]);
    }
}

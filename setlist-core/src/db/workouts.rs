use log::debug;
use sqlx::SqlitePool;

use crate::db::models::{EntityRef, Workout};
use crate::db::now_millis;
use crate::error::{StoreError, StoreResult};
use crate::validation::WorkoutFields;

const WORKOUT_COLUMNS: &str = "id, name, description, rest_time, created_at, updated_at";

pub async fn create_workout(pool: &SqlitePool, fields: &WorkoutFields) -> StoreResult<Workout> {
    let now = now_millis();
    let workout = sqlx::query_as::<_, Workout>(&format!(
        "INSERT INTO workouts (name, description, rest_time, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)
         RETURNING {}",
        WORKOUT_COLUMNS
    ))
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(fields.rest_time)
    .bind(now)
    .fetch_one(pool)
    .await?;
    debug!("Created workout {} ({})", workout.id, workout.name);
    Ok(workout)
}

pub async fn get_workout(pool: &SqlitePool, workout_id: i64) -> StoreResult<Option<Workout>> {
    Ok(sqlx::query_as::<_, Workout>(&format!(
        "SELECT {} FROM workouts WHERE id = ?1",
        WORKOUT_COLUMNS
    ))
    .bind(workout_id)
    .fetch_optional(pool)
    .await?)
}

pub async fn get_all_workouts(pool: &SqlitePool, limit: Option<i64>) -> StoreResult<Vec<Workout>> {
    Ok(sqlx::query_as::<_, Workout>(&format!(
        "SELECT {} FROM workouts ORDER BY id LIMIT ?1",
        WORKOUT_COLUMNS
    ))
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await?)
}

pub async fn update_workout(
    pool: &SqlitePool,
    workout_id: i64,
    fields: &WorkoutFields,
) -> StoreResult<Workout> {
    sqlx::query_as::<_, Workout>(&format!(
        "UPDATE workouts SET name = ?1, description = ?2, rest_time = ?3, updated_at = ?4
         WHERE id = ?5
         RETURNING {}",
        WORKOUT_COLUMNS
    ))
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(fields.rest_time)
    .bind(now_millis())
    .bind(workout_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| StoreError::not_found("Workout", workout_id))
}

/// Deletes the workout; its sets and their exercise links go with it.
pub async fn delete_workout(pool: &SqlitePool, workout_id: i64) -> StoreResult<EntityRef> {
    let deleted: Option<(i64, String)> =
        sqlx::query_as("DELETE FROM workouts WHERE id = ?1 RETURNING id, name")
            .bind(workout_id)
            .fetch_optional(pool)
            .await?;
    let (id, name) = deleted.ok_or_else(|| StoreError::not_found("Workout", workout_id))?;
    debug!("Deleted workout {} ({})", id, name);
    Ok(EntityRef { id, name })
}

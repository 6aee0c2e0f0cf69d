//! Read-side views: parents with their children in order, plus the
//! exercise cross-references the set editor needs.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::db::models::{Exercise, Set, Workout, display_set_name};
use crate::error::StoreResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSummary {
    pub id: i64,
    pub name: String,
    pub set_order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutWithSets {
    #[serde(flatten)]
    pub workout: Workout,
    pub sets: Vec<SetSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseInSet {
    pub id: i64,
    pub name: String,
    pub reps: Option<i64>,
    pub duration: Option<i64>,
    pub exercise_order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetWithExercises {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub set: Set,
    pub workout_name: String,
    #[sqlx(skip)]
    pub exercises: Vec<ExerciseInSet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetUsage {
    pub set_id: i64,
    pub set_name: String,
    pub workout_id: i64,
    pub workout_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseWithSets {
    #[serde(flatten)]
    pub exercise: Exercise,
    pub sets: Vec<SetUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseWithOrder {
    pub id: i64,
    pub name: String,
    pub reps: Option<i64>,
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise_order: Option<i64>,
}

#[derive(FromRow)]
struct SetSummaryRow {
    workout_id: i64,
    id: i64,
    name: String,
    set_order: i64,
}

#[derive(FromRow)]
struct LinkedExerciseRow {
    set_id: i64,
    #[sqlx(flatten)]
    exercise: ExerciseInSet,
}

#[derive(FromRow)]
struct UsageRow {
    exercise_id: i64,
    set_id: i64,
    set_name: String,
    set_order: i64,
    workout_id: i64,
    workout_name: String,
}

impl From<UsageRow> for SetUsage {
    fn from(row: UsageRow) -> Self {
        SetUsage {
            set_id: row.set_id,
            set_name: display_set_name(&row.set_name, row.set_order),
            workout_id: row.workout_id,
            workout_name: row.workout_name,
        }
    }
}

/// Stable sort placing items with an order first, ascending, and the
/// unordered ones after them in their incoming sequence.
pub fn sort_ordered_first<T>(items: &mut [T], order_of: impl Fn(&T) -> Option<i64>) {
    items.sort_by_key(|item| match order_of(item) {
        Some(order) => (false, order),
        None => (true, 0),
    });
}

fn group_sets(rows: Vec<SetSummaryRow>) -> HashMap<i64, Vec<SetSummary>> {
    let mut grouped: HashMap<i64, Vec<SetSummary>> = HashMap::new();
    for row in rows {
        grouped.entry(row.workout_id).or_default().push(SetSummary {
            id: row.id,
            name: display_set_name(&row.name, row.set_order),
            set_order: row.set_order,
        });
    }
    grouped
}

/// Workouts by id, each with its sets ascending by order.
pub async fn list_workouts(pool: &SqlitePool, limit: Option<i64>) -> StoreResult<Vec<WorkoutWithSets>> {
    let workouts = crate::db::workouts::get_all_workouts(pool, limit).await?;
    let rows: Vec<SetSummaryRow> = sqlx::query_as(
        "SELECT s.workout_id, s.id, s.name, s.set_order
         FROM sets s
         JOIN (SELECT id FROM workouts ORDER BY id LIMIT ?1) w ON w.id = s.workout_id
         ORDER BY s.workout_id, s.set_order",
    )
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await?;

    let mut grouped = group_sets(rows);
    Ok(workouts
        .into_iter()
        .map(|workout| WorkoutWithSets {
            sets: grouped.remove(&workout.id).unwrap_or_default(),
            workout,
        })
        .collect())
}

pub async fn get_workout_with_sets(
    pool: &SqlitePool,
    workout_id: i64,
) -> StoreResult<Option<WorkoutWithSets>> {
    let Some(workout) = crate::db::workouts::get_workout(pool, workout_id).await? else {
        return Ok(None);
    };
    let rows: Vec<SetSummaryRow> = sqlx::query_as(
        "SELECT workout_id, id, name, set_order FROM sets WHERE workout_id = ?1 ORDER BY set_order",
    )
    .bind(workout_id)
    .fetch_all(pool)
    .await?;
    let sets = group_sets(rows).remove(&workout_id).unwrap_or_default();
    Ok(Some(WorkoutWithSets { workout, sets }))
}

async fn attach_exercises(
    pool: &SqlitePool,
    workout_id: Option<i64>,
    sets: &mut [SetWithExercises],
) -> StoreResult<()> {
    let rows: Vec<LinkedExerciseRow> = sqlx::query_as(
        "SELECT se.set_id, e.id, e.name, e.reps, e.duration, se.exercise_order
         FROM set_exercises se
         JOIN exercises e ON e.id = se.exercise_id
         JOIN sets s ON s.id = se.set_id
         WHERE (?1 IS NULL OR s.workout_id = ?1)
         ORDER BY se.set_id, se.exercise_order",
    )
    .bind(workout_id)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<i64, Vec<ExerciseInSet>> = HashMap::new();
    for row in rows {
        grouped.entry(row.set_id).or_default().push(row.exercise);
    }
    for set in sets.iter_mut() {
        set.exercises = grouped.remove(&set.set.id).unwrap_or_default();
    }
    Ok(())
}

/// Sets ascending by workout then order, each with its exercises in order.
pub async fn list_sets(
    pool: &SqlitePool,
    workout_id: Option<i64>,
    limit: Option<i64>,
) -> StoreResult<Vec<SetWithExercises>> {
    let mut sets: Vec<SetWithExercises> = sqlx::query_as(
        "SELECT s.id, s.workout_id, s.name, s.description, s.set_order, s.rest_time,
                s.created_at, s.updated_at, w.name AS workout_name
         FROM sets s
         JOIN workouts w ON w.id = s.workout_id
         WHERE (?1 IS NULL OR s.workout_id = ?1)
         ORDER BY s.workout_id, s.set_order
         LIMIT ?2",
    )
    .bind(workout_id)
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await?;
    attach_exercises(pool, workout_id, &mut sets).await?;
    Ok(sets)
}

pub async fn get_set_with_exercises(
    pool: &SqlitePool,
    set_id: i64,
) -> StoreResult<Option<SetWithExercises>> {
    let found: Option<SetWithExercises> = sqlx::query_as(
        "SELECT s.id, s.workout_id, s.name, s.description, s.set_order, s.rest_time,
                s.created_at, s.updated_at, w.name AS workout_name
         FROM sets s
         JOIN workouts w ON w.id = s.workout_id
         WHERE s.id = ?1",
    )
    .bind(set_id)
    .fetch_optional(pool)
    .await?;
    let Some(set) = found else {
        return Ok(None);
    };

    let mut sets = [set];
    attach_exercises(pool, Some(sets[0].set.workout_id), &mut sets).await?;
    let [set] = sets;
    Ok(Some(set))
}

const USAGE_SELECT: &str = "SELECT se.exercise_id, s.id AS set_id, s.name AS set_name, s.set_order,
        w.id AS workout_id, w.name AS workout_name
     FROM set_exercises se
     JOIN sets s ON s.id = se.set_id
     JOIN workouts w ON w.id = s.workout_id";

/// An exercise together with every set that uses it.
pub async fn get_exercise_with_sets(
    pool: &SqlitePool,
    exercise_id: i64,
) -> StoreResult<Option<ExerciseWithSets>> {
    let Some(exercise) = crate::db::exercises::get_exercise(pool, exercise_id).await? else {
        return Ok(None);
    };
    let rows: Vec<UsageRow> = sqlx::query_as(&format!(
        "{} WHERE se.exercise_id = ?1 ORDER BY w.id, s.set_order",
        USAGE_SELECT
    ))
    .bind(exercise_id)
    .fetch_all(pool)
    .await?;
    Ok(Some(ExerciseWithSets {
        exercise,
        sets: rows.into_iter().map(SetUsage::from).collect(),
    }))
}

/// Exercises by id with their usages. Given a set, only exercises in that
/// set are returned and only that usage is listed.
pub async fn list_exercises_with_set_info(
    pool: &SqlitePool,
    set_id: Option<i64>,
) -> StoreResult<Vec<ExerciseWithSets>> {
    let exercises: Vec<Exercise> = sqlx::query_as(
        "SELECT e.id, e.name, e.description, e.image_url, e.reps, e.duration, e.created_at, e.updated_at
         FROM exercises e
         WHERE ?1 IS NULL
            OR EXISTS (SELECT 1 FROM set_exercises se WHERE se.exercise_id = e.id AND se.set_id = ?1)
         ORDER BY e.id",
    )
    .bind(set_id)
    .fetch_all(pool)
    .await?;
    let rows: Vec<UsageRow> = sqlx::query_as(&format!(
        "{} WHERE (?1 IS NULL OR se.set_id = ?1) ORDER BY w.id, s.set_order",
        USAGE_SELECT
    ))
    .bind(set_id)
    .fetch_all(pool)
    .await?;

    let mut usages: HashMap<i64, Vec<SetUsage>> = HashMap::new();
    for row in rows {
        usages.entry(row.exercise_id).or_default().push(row.into());
    }
    Ok(exercises
        .into_iter()
        .map(|exercise| ExerciseWithSets {
            sets: usages.remove(&exercise.id).unwrap_or_default(),
            exercise,
        })
        .collect())
}

/// Every exercise, carrying `exercise_order` only for the given set.
/// Exercises in the set come first in set order, the rest follow by id.
pub async fn list_exercises_with_optional_order(
    pool: &SqlitePool,
    set_id: Option<i64>,
) -> StoreResult<Vec<ExerciseWithOrder>> {
    let mut exercises: Vec<ExerciseWithOrder> = sqlx::query_as(
        "SELECT e.id, e.name, e.reps, e.duration, se.exercise_order
         FROM exercises e
         LEFT JOIN set_exercises se ON se.exercise_id = e.id AND se.set_id = ?1
         ORDER BY e.id",
    )
    .bind(set_id)
    .fetch_all(pool)
    .await?;
    sort_ordered_first(&mut exercises, |e| e.exercise_order);
    Ok(exercises)
}

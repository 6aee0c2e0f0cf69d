use std::fmt;

use serde::Serialize;
use sqlx::FromRow;

use crate::validation::DEFAULT_SET_NAME;

// Workout models
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub rest_time: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

// Set models
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Set {
    pub id: i64,
    pub workout_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub set_order: i64,
    pub rest_time: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Set {
    pub fn display_name(&self) -> String {
        display_set_name(&self.name, self.set_order)
    }
}

pub(crate) fn display_set_name(name: &str, set_order: i64) -> String {
    if name.trim().is_empty() {
        format!("{} {}", DEFAULT_SET_NAME, set_order)
    } else {
        name.to_string()
    }
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} (rest {}s)",
            self.set_order,
            self.display_name(),
            self.rest_time
        )
    }
}

// Exercise models
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub reps: Option<i64>,
    pub duration: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.reps, self.duration) {
            (Some(reps), _) => write!(f, "{} x {} reps", self.name, reps),
            (None, Some(duration)) => write!(f, "{} for {}s", self.name, duration),
            (None, None) => write!(f, "{}", self.name),
        }
    }
}

/// What every create/update/delete hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRef {
    pub id: i64,
    pub name: String,
}

impl From<&Workout> for EntityRef {
    fn from(workout: &Workout) -> Self {
        EntityRef {
            id: workout.id,
            name: workout.name.clone(),
        }
    }
}

impl From<&Set> for EntityRef {
    fn from(set: &Set) -> Self {
        EntityRef {
            id: set.id,
            name: set.display_name(),
        }
    }
}

impl From<&Exercise> for EntityRef {
    fn from(exercise: &Exercise) -> Self {
        EntityRef {
            id: exercise.id,
            name: exercise.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseOrderChange {
    pub id: i64,
    pub new_order: i64,
}

/// One child's final position after a bulk reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reordered {
    pub parent_id: i64,
    pub positions: Vec<Position>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: i64,
    pub order: i64,
}

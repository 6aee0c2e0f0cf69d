use serde_json::Value;

use crate::db::exercises;
use crate::db::models::{EntityRef, ExerciseOrderChange, Reordered};
use crate::db::projections::{self, ExerciseWithOrder, ExerciseWithSets};
use crate::error::{StoreError, StoreResult};
use crate::outcome::ActionResult;
use crate::store::Store;
use crate::validation::{EXERCISE_ORDERING, MAX_ORDER, parse_exercise, parse_id, parse_ordering};

impl Store {
    /// Create an exercise, optionally placing it in a set via `setId` and
    /// `exerciseOrder`.
    pub async fn create_exercise(&self, raw: Value) -> ActionResult<EntityRef> {
        async {
            let fields = parse_exercise(raw)?;
            let exercise = exercises::create_exercise(&self.pool, &fields).await?;
            Ok::<_, StoreError>(EntityRef::from(&exercise))
        }
        .await
        .into()
    }

    pub async fn update_exercise(&self, exercise_id: i64, raw: Value) -> ActionResult<EntityRef> {
        async {
            let fields = parse_exercise(raw)?;
            let exercise = exercises::update_exercise(&self.pool, exercise_id, &fields).await?;
            Ok::<_, StoreError>(EntityRef::from(&exercise))
        }
        .await
        .into()
    }

    /// Refused while any set still uses the exercise.
    pub async fn delete_exercise(&self, raw_id: &Value) -> ActionResult<EntityRef> {
        async {
            let exercise_id = parse_id(raw_id, "Invalid exercise ID")?;
            exercises::delete_exercise(&self.pool, exercise_id).await
        }
        .await
        .into()
    }

    pub async fn update_exercise_order_in_set(
        &self,
        set_id: i64,
        exercise_id: i64,
        new_order: i64,
    ) -> ActionResult<ExerciseOrderChange> {
        let result: StoreResult<ExerciseOrderChange> = if !(1..=MAX_ORDER).contains(&new_order) {
            Err(StoreError::invalid(
                "newOrder",
                format!("Exercise order must be between 1 and {}", MAX_ORDER),
            ))
        } else {
            exercises::update_exercise_order_in_set(&self.pool, set_id, exercise_id, new_order)
                .await
        };
        result.into()
    }

    pub async fn remove_exercise_from_set(
        &self,
        set_id: i64,
        exercise_id: i64,
    ) -> ActionResult<EntityRef> {
        exercises::unlink_exercise_from_set(&self.pool, set_id, exercise_id)
            .await
            .into()
    }

    /// Accepts `[{exerciseId, exerciseOrder, setId}, ...]` or
    /// `{"reorderedExercises": [...]}`.
    pub async fn reorder_set_exercises(&self, raw: Value) -> ActionResult<Reordered> {
        async {
            let ordering = parse_ordering(raw, EXERCISE_ORDERING)?;
            exercises::reorder_set_exercises(&self.pool, &ordering).await
        }
        .await
        .into()
    }

    pub async fn exercise(&self, exercise_id: i64) -> StoreResult<Option<ExerciseWithSets>> {
        projections::get_exercise_with_sets(&self.pool, exercise_id).await
    }

    pub async fn exercises_with_set_info(
        &self,
        set_id: Option<i64>,
    ) -> StoreResult<Vec<ExerciseWithSets>> {
        projections::list_exercises_with_set_info(&self.pool, set_id).await
    }

    pub async fn exercises_with_optional_order(
        &self,
        set_id: Option<i64>,
    ) -> StoreResult<Vec<ExerciseWithOrder>> {
        projections::list_exercises_with_optional_order(&self.pool, set_id).await
    }
}

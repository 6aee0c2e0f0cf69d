use serde_json::Value;

use crate::db::models::{EntityRef, Reordered};
use crate::db::projections::{self, SetWithExercises};
use crate::db::sets;
use crate::error::{StoreError, StoreResult};
use crate::outcome::ActionResult;
use crate::store::Store;
use crate::validation::{SET_ORDERING, parse_ordering, parse_set};

impl Store {
    /// Create a set at its requested order. A set already on that order is
    /// moved to the end of the workout.
    pub async fn create_set(&self, raw: Value) -> ActionResult<EntityRef> {
        async {
            let fields = parse_set(raw)?;
            let set = sets::create_set(&self.pool, &fields).await?;
            Ok::<_, StoreError>(EntityRef::from(&set))
        }
        .await
        .into()
    }

    /// Update a set. Changing its order swaps it with the set on the target
    /// order; nothing else moves.
    pub async fn update_set(&self, set_id: i64, raw: Value) -> ActionResult<EntityRef> {
        async {
            let fields = parse_set(raw)?;
            let set = sets::update_set(&self.pool, set_id, &fields).await?;
            Ok::<_, StoreError>(EntityRef::from(&set))
        }
        .await
        .into()
    }

    pub async fn delete_set(&self, set_id: i64) -> ActionResult<EntityRef> {
        sets::delete_set(&self.pool, set_id).await.into()
    }

    /// Accepts `[{id, setOrder, workoutId}, ...]` or `{"reorderedSets": [...]}`.
    pub async fn reorder_sets(&self, raw: Value) -> ActionResult<Reordered> {
        async {
            let ordering = parse_ordering(raw, SET_ORDERING)?;
            sets::reorder_sets(&self.pool, &ordering).await
        }
        .await
        .into()
    }

    pub async fn sets(
        &self,
        workout_id: Option<i64>,
        limit: Option<i64>,
    ) -> StoreResult<Vec<SetWithExercises>> {
        projections::list_sets(&self.pool, workout_id, limit).await
    }

    pub async fn set(&self, set_id: i64) -> StoreResult<Option<SetWithExercises>> {
        projections::get_set_with_exercises(&self.pool, set_id).await
    }
}

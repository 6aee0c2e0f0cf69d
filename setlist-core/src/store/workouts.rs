use serde_json::Value;

use crate::db::models::EntityRef;
use crate::db::projections::{self, WorkoutWithSets};
use crate::db::workouts;
use crate::error::{StoreError, StoreResult};
use crate::outcome::ActionResult;
use crate::store::Store;
use crate::validation::parse_workout;

impl Store {
    pub async fn create_workout(&self, raw: Value) -> ActionResult<EntityRef> {
        async {
            let fields = parse_workout(raw)?;
            let workout = workouts::create_workout(&self.pool, &fields).await?;
            Ok::<_, StoreError>(EntityRef::from(&workout))
        }
        .await
        .into()
    }

    pub async fn update_workout(&self, workout_id: i64, raw: Value) -> ActionResult<EntityRef> {
        async {
            let fields = parse_workout(raw)?;
            let workout = workouts::update_workout(&self.pool, workout_id, &fields).await?;
            Ok::<_, StoreError>(EntityRef::from(&workout))
        }
        .await
        .into()
    }

    /// Deletes the workout with all of its sets and their exercise links.
    pub async fn delete_workout(&self, workout_id: i64) -> ActionResult<EntityRef> {
        workouts::delete_workout(&self.pool, workout_id).await.into()
    }

    pub async fn workouts(&self, limit: Option<i64>) -> StoreResult<Vec<WorkoutWithSets>> {
        projections::list_workouts(&self.pool, limit).await
    }

    pub async fn workout(&self, workout_id: i64) -> StoreResult<Option<WorkoutWithSets>> {
        projections::get_workout_with_sets(&self.pool, workout_id).await
    }
}

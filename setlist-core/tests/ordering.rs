use std::collections::HashSet;

use serde_json::{Value, json};
use setlist::{ErrorKind, Store};

async fn store() -> Store {
    Store::in_memory().await.unwrap()
}

async fn workout(store: &Store, name: &str) -> i64 {
    store
        .create_workout(json!({ "name": name, "restTime": 90 }))
        .await
        .into_data()
        .unwrap()
        .id
}

async fn set(store: &Store, workout_id: i64, name: &str, order: i64) -> i64 {
    store
        .create_set(json!({
            "workoutId": workout_id,
            "name": name,
            "setOrder": order,
            "restTime": 30
        }))
        .await
        .into_data()
        .unwrap()
        .id
}

async fn exercise(store: &Store, name: &str) -> i64 {
    store
        .create_exercise(json!({ "name": name, "reps": 10 }))
        .await
        .into_data()
        .unwrap()
        .id
}

/// (set id, order) pairs for a workout, ascending by order.
async fn set_orders(store: &Store, workout_id: i64) -> Vec<(i64, i64)> {
    store
        .workout(workout_id)
        .await
        .unwrap()
        .unwrap()
        .sets
        .into_iter()
        .map(|s| (s.id, s.set_order))
        .collect()
}

fn order_of(orders: &[(i64, i64)], id: i64) -> i64 {
    orders
        .iter()
        .find(|(set_id, _)| *set_id == id)
        .map(|(_, order)| *order)
        .unwrap()
}

fn assert_unique(orders: &[(i64, i64)]) {
    let distinct: HashSet<i64> = orders.iter().map(|(_, order)| *order).collect();
    assert_eq!(distinct.len(), orders.len(), "duplicate order in {:?}", orders);
}

#[tokio::test]
async fn create_on_taken_order_appends_the_previous_holder() {
    let store = store().await;
    let w = workout(&store, "Push").await;
    let a = set(&store, w, "A", 1).await;
    let b = set(&store, w, "B", 2).await;

    let c = set(&store, w, "C", 1).await;

    let orders = set_orders(&store, w).await;
    assert_unique(&orders);
    assert_eq!(order_of(&orders, c), 1);
    assert_eq!(order_of(&orders, a), 3);
    assert_eq!(order_of(&orders, b), 2);
}

#[tokio::test]
async fn moving_onto_a_taken_order_swaps_only_the_pair() {
    let store = store().await;
    let w = workout(&store, "Push").await;
    let mut ids = Vec::new();
    for order in 1..=5 {
        ids.push(set(&store, w, &format!("S{}", order), order).await);
    }

    let moved = store
        .update_set(
            ids[1],
            json!({ "workoutId": w, "name": "S2", "setOrder": 5, "restTime": 30 }),
        )
        .await;
    assert!(moved.is_success());

    let orders = set_orders(&store, w).await;
    assert_unique(&orders);
    assert_eq!(order_of(&orders, ids[1]), 5);
    assert_eq!(order_of(&orders, ids[4]), 2);
    for (i, id) in [(0, ids[0]), (2, ids[2]), (3, ids[3])] {
        assert_eq!(order_of(&orders, id), i + 1);
    }
}

#[tokio::test]
async fn bulk_reorder_permutation_reads_back_exactly() {
    let store = store().await;
    let w = workout(&store, "Push").await;
    let a = set(&store, w, "A", 1).await;
    let b = set(&store, w, "B", 2).await;
    let c = set(&store, w, "C", 3).await;

    let result = store
        .reorder_sets(json!({
            "reorderedSets": [
                { "id": a, "setOrder": 3, "workoutId": w },
                { "id": b, "setOrder": 1, "workoutId": w },
                { "id": c, "setOrder": 2, "workoutId": w },
            ]
        }))
        .await;
    assert!(result.is_success());

    assert_eq!(set_orders(&store, w).await, vec![(b, 1), (c, 2), (a, 3)]);
}

#[tokio::test]
async fn bulk_reorder_failure_leaves_every_order_untouched() {
    let store = store().await;
    let w = workout(&store, "Push").await;
    let a = set(&store, w, "A", 1).await;
    let b = set(&store, w, "B", 2).await;
    let c = set(&store, w, "C", 3).await;

    let result = store
        .reorder_sets(json!([
            { "id": a, "setOrder": 2, "workoutId": w },
            { "id": b, "setOrder": 3, "workoutId": w },
        ]))
        .await;
    assert_eq!(result.kind(), Some(ErrorKind::Conflict));
    assert!(result.root_error().is_some());

    assert_eq!(set_orders(&store, w).await, vec![(a, 1), (b, 2), (c, 3)]);
}

#[tokio::test]
async fn orders_beyond_the_ceiling_are_refused_before_touching_rows() {
    let store = store().await;
    let w = workout(&store, "Push").await;
    let a = set(&store, w, "A", 1).await;

    for _ in 0..2 {
        let result = store
            .create_set(json!({ "workoutId": w, "setOrder": i64::MAX, "restTime": 30 }))
            .await;
        assert_eq!(result.kind(), Some(ErrorKind::Validation));
        assert_eq!(result.errors()[0].field, "setOrder");
    }

    let result = store
        .reorder_sets(json!([{ "id": a, "setOrder": i64::MAX - 5, "workoutId": w }]))
        .await;
    assert_eq!(result.kind(), Some(ErrorKind::Validation));

    assert_eq!(set_orders(&store, w).await, vec![(a, 1)]);
}

#[tokio::test]
async fn unchanged_order_is_a_plain_update() {
    let store = store().await;
    let w = workout(&store, "Push").await;
    let a = set(&store, w, "A", 1).await;
    let b = set(&store, w, "B", 2).await;

    let result = store
        .update_set(
            a,
            json!({ "workoutId": w, "name": "Warmup", "setOrder": 1, "restTime": 45 }),
        )
        .await;
    assert_eq!(result.data().map(|r| r.name.as_str()), Some("Warmup"));
    assert_eq!(set_orders(&store, w).await, vec![(a, 1), (b, 2)]);
}

#[tokio::test]
async fn exercise_delete_is_guarded_by_links() {
    let store = store().await;
    let w = workout(&store, "Legs").await;
    let s = set(&store, w, "A", 1).await;
    let used = store
        .create_exercise(json!({
            "name": "Squat",
            "reps": 5,
            "setId": s,
            "exerciseOrder": 1
        }))
        .await
        .into_data()
        .unwrap()
        .id;
    let free = exercise(&store, "Lunge").await;

    let refused = store.delete_exercise(&json!(used)).await;
    assert_eq!(refused.kind(), Some(ErrorKind::BusinessRule));
    assert_eq!(
        refused.root_error(),
        Some("Cannot delete: exercise is assigned to one or more sets.")
    );
    assert!(store.exercise(used).await.unwrap().is_some());

    let deleted = store.delete_exercise(&json!(free.to_string())).await;
    assert!(deleted.is_success());
    assert!(store.exercise(free).await.unwrap().is_none());
}

#[tokio::test]
async fn deletes_cascade_links_but_never_exercises() {
    let store = store().await;
    let w = workout(&store, "Legs").await;
    let s1 = set(&store, w, "A", 1).await;
    let s2 = set(&store, w, "B", 2).await;
    let squat = exercise(&store, "Squat").await;
    for (set_id, order) in [(s1, 1), (s2, 1)] {
        let linked = store
            .update_exercise(
                squat,
                json!({ "name": "Squat", "reps": 10, "setId": set_id, "exerciseOrder": order }),
            )
            .await;
        assert!(linked.is_success());
    }

    assert!(store.delete_set(s1).await.is_success());
    let usage = store.exercise(squat).await.unwrap().unwrap();
    assert_eq!(usage.sets.len(), 1);
    assert_eq!(usage.sets[0].set_id, s2);

    assert!(store.delete_workout(w).await.is_success());
    let usage = store.exercise(squat).await.unwrap().unwrap();
    assert!(usage.sets.is_empty());
    assert!(store.sets(None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn exercise_orders_stay_unique_through_mixed_edits() {
    let store = store().await;
    let w = workout(&store, "Full body").await;
    let s = set(&store, w, "Circuit", 1).await;
    let mut ids = Vec::new();
    for (i, name) in ["Squat", "Push-up", "Row", "Plank"].iter().enumerate() {
        let id = store
            .create_exercise(json!({
                "name": name,
                "reps": 10,
                "setId": s,
                "exerciseOrder": (i as i64) + 1
            }))
            .await
            .into_data()
            .unwrap()
            .id;
        ids.push(id);
    }

    let newcomer = store
        .create_exercise(json!({ "name": "Burpee", "reps": 10, "setId": s, "exerciseOrder": 2 }))
        .await
        .into_data()
        .unwrap()
        .id;
    assert!(store
        .update_exercise_order_in_set(s, ids[0], 4)
        .await
        .is_success());
    assert!(store.remove_exercise_from_set(s, ids[2]).await.is_success());

    let listed = store.set(s).await.unwrap().unwrap();
    let orders: Vec<(i64, i64)> = listed
        .exercises
        .iter()
        .map(|e| (e.id, e.exercise_order))
        .collect();
    assert_unique(&orders);
    assert_eq!(orders.len(), 4);
    assert_eq!(order_of(&orders, newcomer), 2);
    assert_eq!(order_of(&orders, ids[1]), 5);
    assert_eq!(order_of(&orders, ids[0]), 4);
    assert_eq!(order_of(&orders, ids[3]), 1);

    let reordered = store
        .reorder_set_exercises(Value::Array(
            orders
                .iter()
                .enumerate()
                .map(|(i, (id, _))| {
                    json!({ "exerciseId": id, "exerciseOrder": i + 1, "setId": s })
                })
                .collect(),
        ))
        .await;
    assert!(reordered.is_success());
    let dense: Vec<i64> = store
        .set(s)
        .await
        .unwrap()
        .unwrap()
        .exercises
        .iter()
        .map(|e| e.exercise_order)
        .collect();
    assert_eq!(dense, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn failure_shape_serialises_field_keyed_errors() {
    let store = store().await;
    let result = store.create_set(json!({ "name": "A" })).await;
    let wire = serde_json::to_value(&result).unwrap();
    assert_eq!(wire["success"], json!(false));
    assert_eq!(wire["kind"], json!("validation"));
    let errors = wire["errors"].as_array().unwrap();
    assert!(errors.contains(&json!({ "workoutId": "Workout ID is required" })));
    assert!(errors.contains(&json!({ "setOrder": "Set order is required" })));
}

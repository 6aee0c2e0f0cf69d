//! Input validation for raw caller payloads.
//!
//! Callers hand over untyped JSON straight from a form. Numbers may arrive as
//! strings, optional text may arrive empty. Everything here turns that into
//! typed field sets or a list of field-keyed messages.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use validator::{Validate, ValidationErrors};

use crate::error::{FieldError, StoreError, StoreResult};

pub const DEFAULT_SET_NAME: &str = "Set";

/// Highest order a set or exercise may be given. Keeps every tail slot and
/// reorder staging value far inside `i64`.
pub const MAX_ORDER: i64 = 1_000_000;

// ── Lenient field decoding ──────────────────────────────────────────

pub(crate) fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(coerce_int))
}

fn required_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s.trim().to_string()),
        _ => None,
    })
}

fn optional_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(required_text(d)?.filter(|s| !s.is_empty()))
}

fn decode<T: for<'de> Deserialize<'de>>(raw: Value) -> StoreResult<T> {
    serde_json::from_value(raw)
        .map_err(|e| StoreError::Validation(vec![FieldError::root(format!("Invalid input: {}", e))]))
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Flatten derive-level errors into one message per field, keyed by the
/// wire (camelCase) name.
fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| {
            errs.first().map(|e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                FieldError::new(camel_case(&field.to_string()), message)
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn check(derived: Result<(), ValidationErrors>, extra: Vec<FieldError>) -> StoreResult<()> {
    let mut errors = match derived {
        Ok(()) => Vec::new(),
        Err(e) => field_errors(&e),
    };
    for e in extra {
        if !errors.iter().any(|x| x.field == e.field) {
            errors.push(e);
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(StoreError::Validation(errors))
    }
}

// ── Workouts ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct WorkoutInput {
    #[serde(default, deserialize_with = "required_text")]
    #[validate(
        required(message = "Name is required"),
        length(min = 1, message = "Name is required")
    )]
    name: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    #[validate(
        required(message = "Rest between sets in seconds required"),
        range(min = 1, message = "Rest between sets in seconds required")
    )]
    rest_time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkoutFields {
    pub name: String,
    pub description: Option<String>,
    pub rest_time: i64,
}

pub fn parse_workout(raw: Value) -> StoreResult<WorkoutFields> {
    let input: WorkoutInput = decode(raw)?;
    check(input.validate(), Vec::new())?;
    Ok(WorkoutFields {
        name: input.name.unwrap_or_default(),
        description: input.description,
        rest_time: input.rest_time.unwrap_or_default(),
    })
}

// ── Sets ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct SetInput {
    #[serde(default, deserialize_with = "required_text")]
    #[validate(length(min = 1, message = "Name is required"))]
    name: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    #[validate(
        required(message = "Rest between exercises in seconds required"),
        range(min = 1, message = "Rest between exercises in seconds required")
    )]
    rest_time: Option<i64>,
    #[serde(default, alias = "setNumber", deserialize_with = "lenient_int")]
    #[validate(
        required(message = "Set order is required"),
        range(min = 1, max = 1_000_000, message = "Set order must be between 1 and 1000000")
    )]
    set_order: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    #[validate(
        required(message = "Workout ID is required"),
        range(min = 1, message = "Workout ID is required")
    )]
    workout_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetFields {
    pub workout_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub set_order: i64,
    pub rest_time: i64,
}

pub fn parse_set(raw: Value) -> StoreResult<SetFields> {
    let input: SetInput = decode(raw)?;
    check(input.validate(), Vec::new())?;
    Ok(SetFields {
        workout_id: input.workout_id.unwrap_or_default(),
        name: input
            .name
            .unwrap_or_else(|| DEFAULT_SET_NAME.to_string()),
        description: input.description,
        set_order: input.set_order.unwrap_or_default(),
        rest_time: input.rest_time.unwrap_or_default(),
    })
}

// ── Exercises ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ExerciseInput {
    #[serde(default, deserialize_with = "required_text")]
    #[validate(
        required(message = "Exercise name is required"),
        length(min = 1, message = "Exercise name is required")
    )]
    name: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    description: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    #[validate(url(message = "Invalid image URL"))]
    image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    #[validate(range(min = 1, message = "Reps must be at least 1"))]
    reps: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    #[validate(range(min = 1, message = "Duration must be at least 1 second"))]
    duration: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    #[validate(range(min = 1, message = "Set ID must be positive"))]
    set_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "Exercise order must be between 1 and 1000000"
    ))]
    exercise_order: Option<i64>,
}

impl ExerciseInput {
    fn cross_field_errors(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        match (self.reps, self.duration) {
            (None, None) => errors.push(FieldError::new("reps", "Provide either reps or duration")),
            (Some(_), Some(_)) => errors.push(FieldError::new(
                "duration",
                "Reps and duration are mutually exclusive",
            )),
            _ => {}
        }
        match (self.set_id, self.exercise_order) {
            (Some(_), None) => errors.push(FieldError::new(
                "exerciseOrder",
                "Exercise order is required when a set is given",
            )),
            (None, Some(_)) => errors.push(FieldError::new(
                "setId",
                "Set ID is required when an exercise order is given",
            )),
            _ => {}
        }
        errors
    }
}

/// Where an exercise should sit inside a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub set_id: i64,
    pub exercise_order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseFields {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub reps: Option<i64>,
    pub duration: Option<i64>,
    pub placement: Option<Placement>,
}

pub fn parse_exercise(raw: Value) -> StoreResult<ExerciseFields> {
    let input: ExerciseInput = decode(raw)?;
    check(input.validate(), input.cross_field_errors())?;
    let placement = match (input.set_id, input.exercise_order) {
        (Some(set_id), Some(exercise_order)) => Some(Placement {
            set_id,
            exercise_order,
        }),
        _ => None,
    };
    Ok(ExerciseFields {
        name: input.name.unwrap_or_default(),
        description: input.description,
        image_url: input.image_url,
        reps: input.reps,
        duration: input.duration,
        placement,
    })
}

// ── Ids and bulk orderings ──────────────────────────────────────────

/// Parse a positive integer id, failing with a root-level message.
pub fn parse_id(raw: &Value, message: &str) -> StoreResult<i64> {
    coerce_int(raw)
        .filter(|id| *id > 0)
        .ok_or_else(|| StoreError::Validation(vec![FieldError::root(message)]))
}

/// Wire key names of one kind of reorder payload.
#[derive(Debug, Clone, Copy)]
pub struct OrderingKeys {
    pub list: &'static str,
    pub child: &'static str,
    pub order: &'static str,
    pub parent: &'static str,
    pub child_label: &'static str,
    pub parent_label: &'static str,
}

pub const SET_ORDERING: OrderingKeys = OrderingKeys {
    list: "reorderedSets",
    child: "id",
    order: "setOrder",
    parent: "workoutId",
    child_label: "Set",
    parent_label: "workout",
};

pub const EXERCISE_ORDERING: OrderingKeys = OrderingKeys {
    list: "reorderedExercises",
    child: "exerciseId",
    order: "exerciseOrder",
    parent: "setId",
    child_label: "Exercise",
    parent_label: "set",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderItem {
    pub child_id: i64,
    pub order: i64,
}

/// A complete or partial new ordering for the children of one parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingOrdering {
    pub parent_id: i64,
    pub items: Vec<OrderItem>,
}

/// Accepts either a bare array of items or an object wrapping the array
/// under `keys.list`.
pub fn parse_ordering(raw: Value, keys: OrderingKeys) -> StoreResult<SiblingOrdering> {
    let list = match raw {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(keys.list) {
            Some(Value::Array(items)) => items,
            _ => return Err(StoreError::invalid(keys.list, "Expected a list of items")),
        },
        _ => return Err(StoreError::invalid(keys.list, "Expected a list of items")),
    };
    if list.is_empty() {
        return Err(StoreError::invalid(keys.list, "Nothing to reorder"));
    }

    let mut errors = Vec::new();
    let mut items = Vec::with_capacity(list.len());
    let mut parents = HashSet::new();
    for (i, item) in list.iter().enumerate() {
        let field = |key: &str| item.get(key).and_then(coerce_int).filter(|v| *v > 0);
        let child = field(keys.child);
        let order = field(keys.order).filter(|v| *v <= MAX_ORDER);
        let parent = field(keys.parent);
        for (value, key) in [(child, keys.child), (order, keys.order), (parent, keys.parent)] {
            if value.is_none() {
                let message = if key == keys.order {
                    format!("{} must be between 1 and {}", key, MAX_ORDER)
                } else {
                    format!("{} must be a positive integer", key)
                };
                errors.push(FieldError::new(
                    format!("{}[{}].{}", keys.list, i, key),
                    message,
                ));
            }
        }
        if let (Some(child_id), Some(order), Some(parent)) = (child, order, parent) {
            parents.insert(parent);
            items.push(OrderItem { child_id, order });
        }
    }
    if !errors.is_empty() {
        return Err(StoreError::Validation(errors));
    }

    if parents.len() != 1 {
        return Err(StoreError::Validation(vec![FieldError::root(format!(
            "All items must belong to the same {}",
            keys.parent_label
        ))]));
    }
    let parent_id = parents.into_iter().next().unwrap_or_default();

    let mut seen_children = HashSet::new();
    let mut seen_orders = HashSet::new();
    for item in &items {
        if !seen_children.insert(item.child_id) {
            errors.push(FieldError::root(format!(
                "{} {} appears more than once",
                keys.child_label, item.child_id
            )));
        }
        if !seen_orders.insert(item.order) {
            errors.push(FieldError::root(format!(
                "Order {} is assigned more than once",
                item.order
            )));
        }
    }
    if !errors.is_empty() {
        return Err(StoreError::Validation(errors));
    }

    Ok(SiblingOrdering { parent_id, items })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields_of(err: StoreError) -> Vec<(String, String)> {
        err.into_field_errors()
            .into_iter()
            .map(|e| (e.field, e.message))
            .collect()
    }

    #[test]
    fn workout_requires_name_and_rest() {
        let err = parse_workout(json!({"name": "", "restTime": 0})).unwrap_err();
        assert_eq!(
            fields_of(err),
            vec![
                ("name".to_string(), "Name is required".to_string()),
                (
                    "restTime".to_string(),
                    "Rest between sets in seconds required".to_string()
                ),
            ]
        );
    }

    #[test]
    fn workout_coerces_numeric_strings() {
        let fields = parse_workout(json!({"name": " Push ", "restTime": "90", "description": ""}))
            .unwrap();
        assert_eq!(
            fields,
            WorkoutFields {
                name: "Push".into(),
                description: None,
                rest_time: 90,
            }
        );
    }

    #[test]
    fn set_name_defaults_and_accepts_legacy_key() {
        let fields = parse_set(json!({"restTime": 30, "setNumber": "2", "workoutId": 1})).unwrap();
        assert_eq!(fields.name, DEFAULT_SET_NAME);
        assert_eq!(fields.set_order, 2);
    }

    #[test]
    fn set_reports_every_missing_field() {
        let err = parse_set(json!({})).unwrap_err();
        let fields: Vec<String> = fields_of(err).into_iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["restTime", "setOrder", "workoutId"]);
    }

    #[test]
    fn non_object_input_is_a_root_error() {
        let err = parse_set(json!("nope")).unwrap_err();
        assert!(err.into_field_errors()[0].is_root());
    }

    #[test]
    fn exercise_needs_exactly_one_of_reps_or_duration() {
        let neither = parse_exercise(json!({"name": "Plank"})).unwrap_err();
        assert_eq!(fields_of(neither)[0].0, "reps");

        let both = parse_exercise(json!({"name": "Plank", "reps": 5, "duration": 30})).unwrap_err();
        assert_eq!(
            fields_of(both),
            vec![(
                "duration".to_string(),
                "Reps and duration are mutually exclusive".to_string()
            )]
        );

        let ok = parse_exercise(json!({"name": "Plank", "duration": "45"})).unwrap();
        assert_eq!(ok.duration, Some(45));
        assert_eq!(ok.placement, None);
    }

    #[test]
    fn exercise_rejects_bad_image_url() {
        let err = parse_exercise(json!({"name": "Squat", "reps": 5, "imageUrl": "not a url"}))
            .unwrap_err();
        assert_eq!(
            fields_of(err),
            vec![("imageUrl".to_string(), "Invalid image URL".to_string())]
        );
    }

    #[test]
    fn exercise_placement_needs_both_halves() {
        let err = parse_exercise(json!({"name": "Squat", "reps": 5, "setId": 3})).unwrap_err();
        assert_eq!(fields_of(err)[0].0, "exerciseOrder");

        let ok = parse_exercise(json!({"name": "Squat", "reps": 5, "setId": 3, "exerciseOrder": 2}))
            .unwrap();
        assert_eq!(
            ok.placement,
            Some(Placement {
                set_id: 3,
                exercise_order: 2
            })
        );
    }

    #[test]
    fn ordering_accepts_wrapped_and_bare_lists() {
        let bare = json!([
            {"id": 1, "setOrder": 2, "workoutId": 9},
            {"id": 2, "setOrder": 1, "workoutId": 9},
        ]);
        let wrapped = json!({"reorderedSets": bare.clone()});
        let a = parse_ordering(bare, SET_ORDERING).unwrap();
        let b = parse_ordering(wrapped, SET_ORDERING).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.parent_id, 9);
        assert_eq!(a.items[0], OrderItem { child_id: 1, order: 2 });
    }

    #[test]
    fn ordering_rejects_duplicates_and_mixed_parents() {
        let dup_order = json!([
            {"id": 1, "setOrder": 1, "workoutId": 9},
            {"id": 2, "setOrder": 1, "workoutId": 9},
        ]);
        assert!(parse_ordering(dup_order, SET_ORDERING).is_err());

        let mixed = json!([
            {"id": 1, "setOrder": 1, "workoutId": 9},
            {"id": 2, "setOrder": 2, "workoutId": 8},
        ]);
        let err = parse_ordering(mixed, SET_ORDERING).unwrap_err();
        assert!(err.into_field_errors()[0].is_root());

        assert!(parse_ordering(json!([]), SET_ORDERING).is_err());
    }

    #[test]
    fn ordering_reports_bad_item_fields() {
        let err = parse_ordering(json!([{"id": 1, "setOrder": 0, "workoutId": 9}]), SET_ORDERING)
            .unwrap_err();
        assert_eq!(fields_of(err)[0].0, "reorderedSets[0].setOrder");
    }

    #[test]
    fn orders_above_the_ceiling_are_rejected() {
        let set = parse_set(json!({"restTime": 30, "setOrder": i64::MAX, "workoutId": 1}))
            .unwrap_err();
        assert_eq!(
            fields_of(set),
            vec![(
                "setOrder".to_string(),
                "Set order must be between 1 and 1000000".to_string()
            )]
        );

        let exercise = parse_exercise(
            json!({"name": "Squat", "reps": 5, "setId": 1, "exerciseOrder": MAX_ORDER + 1}),
        )
        .unwrap_err();
        assert_eq!(fields_of(exercise)[0].0, "exerciseOrder");

        let bulk = parse_ordering(
            json!([{"id": 1, "setOrder": i64::MAX - 5, "workoutId": 9}]),
            SET_ORDERING,
        )
        .unwrap_err();
        assert_eq!(
            fields_of(bulk),
            vec![(
                "reorderedSets[0].setOrder".to_string(),
                "setOrder must be between 1 and 1000000".to_string()
            )]
        );

        assert!(parse_set(json!({"restTime": 30, "setOrder": MAX_ORDER, "workoutId": 1})).is_ok());
    }

    #[test]
    fn huge_or_fractional_floats_do_not_coerce() {
        assert_eq!(coerce_int(&json!(1e30)), None);
        assert_eq!(coerce_int(&json!(-1e30)), None);
        assert_eq!(coerce_int(&json!(2.5)), None);
        assert_eq!(coerce_int(&json!(18446744073709551615u64)), None);
        assert_eq!(coerce_int(&json!(3.0)), Some(3));
    }

    #[test]
    fn ids_must_be_positive() {
        assert_eq!(parse_id(&json!(4), "Invalid exercise ID").unwrap(), 4);
        assert!(parse_id(&json!(-1), "Invalid exercise ID").is_err());
        assert!(parse_id(&json!("x"), "Invalid exercise ID").is_err());
    }

    #[test]
    fn camel_case_maps_rust_fields() {
        assert_eq!(camel_case("rest_time"), "restTime");
        assert_eq!(camel_case("restTime"), "restTime");
    }
}

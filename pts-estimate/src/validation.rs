//! Shape checks for estimate point payloads.

use crate::service::PointValueUpdate;
use pts_core::{
    MAX_POINT_KEY, MAX_POINT_VALUE_LEN, NewEstimatePoint, PtsError, Result, ValidationErrors,
};
use serde_json::Value;
use uuid::Uuid;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const NOT_A_STRING: &str = "Not a valid string.";
const NOT_AN_INTEGER: &str = "A valid integer is required.";
const NOT_A_UUID: &str = "Must be a valid UUID.";

/// Parses the raw `estimate_points` payload of a create request.
///
/// `key` defaults to 0 and `description` to the empty string; `value` is
/// required. Every item is checked so the caller gets all field errors at once.
pub fn parse_points(payload: Option<&Value>) -> Result<Vec<NewEstimatePoint>> {
    let items = match payload {
        None | Some(Value::Null) => {
            return Err(ValidationErrors::non_field("No data provided").into());
        }
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ValidationErrors::non_field(format!(
                "Expected a list of items but got type \"{}\".",
                type_name(other)
            ))
            .into());
        }
    };

    let mut errors = ValidationErrors::new(items.len());
    let mut points = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let Some(fields) = item.as_object() else {
            errors.add(
                index,
                "non_field_errors",
                format!("Invalid data. Expected a dictionary, but got {}.", type_name(item)),
            );
            continue;
        };

        let key = match fields.get("key") {
            None | Some(Value::Null) => Some(0),
            Some(raw) => match as_integer(raw) {
                Some(key) => Some(key),
                None => {
                    errors.add(index, "key", NOT_AN_INTEGER);
                    None
                }
            },
        };

        let value = match fields.get("value") {
            None | Some(Value::Null) => {
                errors.add(index, "value", REQUIRED);
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(_) => {
                errors.add(index, "value", NOT_A_STRING);
                None
            }
        };

        let description = match fields.get("description") {
            None | Some(Value::Null) => Some(String::new()),
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                errors.add(index, "description", NOT_A_STRING);
                None
            }
        };

        if let Some(key) = key {
            check_key(index, key, &mut errors);
        }
        if let Some(value) = &value {
            check_value(index, value, &mut errors);
        }

        if let (Some(key), Some(value), Some(description)) = (key, value, description) {
            if let Ok(key) = i32::try_from(key) {
                points.push(NewEstimatePoint { key, value, description });
            }
        }
    }

    if errors.is_empty() { Ok(points) } else { Err(PtsError::Validation(errors)) }
}

/// Parses the raw `estimate_points` payload of an update request.
///
/// `id` must be a UUID. `value` may be a string, a number or absent. A missing
/// list parses as empty so [`check_updates`] can reject it.
pub fn parse_updates(payload: Option<&Value>) -> Result<Vec<PointValueUpdate>> {
    let items = match payload {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ValidationErrors::non_field(format!(
                "Expected a list of items but got type \"{}\".",
                type_name(other)
            ))
            .into());
        }
    };

    let mut errors = ValidationErrors::new(items.len());
    let mut updates = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let Some(fields) = item.as_object() else {
            errors.add(
                index,
                "non_field_errors",
                format!("Invalid data. Expected a dictionary, but got {}.", type_name(item)),
            );
            continue;
        };

        let id = match fields.get("id") {
            None | Some(Value::Null) => {
                errors.add(index, "id", REQUIRED);
                None
            }
            Some(raw) => match raw.as_str().and_then(|s| Uuid::parse_str(s).ok()) {
                Some(id) => Some(id),
                None => {
                    errors.add(index, "id", NOT_A_UUID);
                    None
                }
            },
        };

        let value = match fields.get("value") {
            None | Some(Value::Null) => Some(None),
            Some(Value::String(s)) => Some(Some(s.clone())),
            Some(Value::Number(n)) => Some(Some(n.to_string())),
            Some(_) => {
                errors.add(index, "value", NOT_A_STRING);
                None
            }
        };

        if let (Some(id), Some(value)) = (id, value) {
            updates.push(PointValueUpdate { id, value });
        }
    }

    if errors.is_empty() { Ok(updates) } else { Err(PtsError::Validation(errors)) }
}

/// Reads the replacement point of a point-delete body. `new_estimate_id` is
/// accepted as an older spelling of `new_estimate_point_id`.
pub fn parse_replacement(body: &Value) -> Result<Option<Uuid>> {
    let fields = match body {
        Value::Null => return Ok(None),
        Value::Object(fields) => fields,
        other => {
            return Err(PtsError::BadRequest(format!(
                "Expected a dictionary but got {}.",
                type_name(other)
            )));
        }
    };

    let (field, raw) = match (fields.get("new_estimate_point_id"), fields.get("new_estimate_id")) {
        (Some(raw), _) => ("new_estimate_point_id", raw),
        (None, Some(raw)) => ("new_estimate_id", raw),
        (None, None) => return Ok(None),
    };
    match raw {
        Value::Null => Ok(None),
        Value::String(s) => Uuid::parse_str(s)
            .map(Some)
            .map_err(|_| PtsError::BadRequest(format!("{field}: {NOT_A_UUID}"))),
        _ => Err(PtsError::BadRequest(format!("{field}: {NOT_A_UUID}"))),
    }
}

/// Field checks for points that arrive already typed.
pub fn check_points(points: &[NewEstimatePoint]) -> Result<()> {
    let mut errors = ValidationErrors::new(points.len());
    for (index, point) in points.iter().enumerate() {
        check_key(index, i64::from(point.key), &mut errors);
        check_value(index, &point.value, &mut errors);
    }
    if errors.is_empty() { Ok(()) } else { Err(PtsError::Validation(errors)) }
}

/// Checks the point list of an update request: it must not be empty and every
/// supplied label must be a valid value.
pub fn check_updates(points: &[PointValueUpdate]) -> Result<()> {
    if points.is_empty() {
        return Err(PtsError::BadRequest("Estimate points are required".into()));
    }

    let mut errors = ValidationErrors::new(points.len());
    for (index, update) in points.iter().enumerate() {
        if let Some(value) = &update.value {
            check_value(index, value, &mut errors);
        }
    }
    if errors.is_empty() { Ok(()) } else { Err(PtsError::Validation(errors)) }
}

fn check_key(index: usize, key: i64, errors: &mut ValidationErrors) {
    if key < 0 {
        errors.add(index, "key", "Ensure this value is greater than or equal to 0.");
    } else if key > i64::from(MAX_POINT_KEY) {
        errors.add(
            index,
            "key",
            format!("Ensure this value is less than or equal to {MAX_POINT_KEY}."),
        );
    }
}

fn check_value(index: usize, value: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(index, "value", BLANK);
    } else if value.chars().count() > MAX_POINT_VALUE_LEN {
        errors.add(
            index,
            "value",
            format!("Ensure this field has no more than {MAX_POINT_VALUE_LEN} characters."),
        );
    }
}

fn as_integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 1e15).map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn errors_of(result: Result<Vec<NewEstimatePoint>>) -> ValidationErrors {
        match result {
            Err(PtsError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_key_and_description() {
        let points = parse_points(Some(&json!([{ "value": "1" }]))).unwrap();
        assert_eq!(
            points,
            vec![NewEstimatePoint { key: 0, value: "1".into(), description: String::new() }]
        );
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let points = parse_points(Some(&json!([{ "key": "3", "value": 5 }]))).unwrap();
        assert_eq!(points[0].key, 3);
        assert_eq!(points[0].value, "5");
    }

    #[test]
    fn test_missing_payload() {
        let errors = errors_of(parse_points(None));
        assert_eq!(errors.non_field_errors(), ["No data provided"]);
    }

    #[test]
    fn test_payload_must_be_a_list() {
        let errors = errors_of(parse_points(Some(&json!({ "key": 1 }))));
        assert!(errors.non_field_errors()[0].contains("dict"));
    }

    #[test]
    fn test_collects_errors_per_item() {
        let payload = json!([
            { "key": 0, "value": "1" },
            { "key": 13, "value": "" },
            { "key": "x", "value": "this label is far too long" }
        ]);
        let errors = errors_of(parse_points(Some(&payload)));

        assert!(errors.field(0, "value").is_empty());
        assert_eq!(errors.field(1, "key").len(), 1);
        assert_eq!(errors.field(1, "value"), [BLANK]);
        assert_eq!(errors.field(2, "key"), [NOT_AN_INTEGER]);
        assert!(errors.field(2, "value")[0].contains("20 characters"));
    }

    #[test]
    fn test_value_required() {
        let errors = errors_of(parse_points(Some(&json!([{ "key": 1 }]))));
        assert_eq!(errors.field(0, "value"), [REQUIRED]);
    }

    #[test]
    fn test_empty_update_is_a_bad_request() {
        assert!(matches!(check_updates(&[]), Err(PtsError::BadRequest(_))));
    }

    #[test]
    fn test_update_without_value_is_accepted() {
        let updates = [PointValueUpdate { id: uuid::Uuid::new_v4(), value: None }];
        assert!(check_updates(&updates).is_ok());
    }

    #[test]
    fn test_update_accepts_numeric_values() {
        let id = uuid::Uuid::new_v4();
        let updates = parse_updates(Some(&json!([{ "id": id.to_string(), "value": 5 }]))).unwrap();
        assert_eq!(updates, vec![PointValueUpdate { id, value: Some("5".into()) }]);
    }

    #[test]
    fn test_update_reports_bad_ids_per_item() {
        let payload = json!([
            { "id": uuid::Uuid::new_v4().to_string(), "value": "1" },
            { "id": "not-a-uuid", "value": "2" },
            { "value": ["3"] }
        ]);
        let errors = match parse_updates(Some(&payload)) {
            Err(PtsError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        };

        assert!(errors.field(0, "id").is_empty());
        assert_eq!(errors.field(1, "id"), [NOT_A_UUID]);
        assert_eq!(errors.field(2, "id"), [REQUIRED]);
        assert_eq!(errors.field(2, "value"), [NOT_A_STRING]);
    }

    #[test]
    fn test_missing_update_list_is_empty() {
        assert!(parse_updates(None).unwrap().is_empty());
        assert!(matches!(parse_updates(Some(&json!("x"))), Err(PtsError::Validation(_))));
    }

    #[test]
    fn test_replacement_accepts_either_field_name() {
        let id = uuid::Uuid::new_v4();
        let current = json!({ "new_estimate_point_id": id.to_string() });
        let legacy = json!({ "new_estimate_id": id.to_string() });

        assert_eq!(parse_replacement(&current).unwrap(), Some(id));
        assert_eq!(parse_replacement(&legacy).unwrap(), Some(id));
        assert_eq!(parse_replacement(&json!({})).unwrap(), None);
        assert_eq!(parse_replacement(&json!({ "new_estimate_point_id": null })).unwrap(), None);
    }

    #[test]
    fn test_replacement_rejects_garbage() {
        let cases = [
            json!({ "new_estimate_id": "garbage" }),
            json!({ "new_estimate_point_id": 7 }),
            json!(["x"]),
        ];
        for body in cases {
            assert!(matches!(parse_replacement(&body), Err(PtsError::BadRequest(_))), "{body}");
        }
    }

    #[test]
    fn test_check_points_rejects_negative_key() {
        let points = [NewEstimatePoint { key: -1, value: "1".into(), description: String::new() }];
        assert!(matches!(check_points(&points), Err(PtsError::Validation(_))));
    }
}

use serde_json::Value;

use crate::errors::SyncError;
use crate::models::DataState;

/// Decoded `action=getData` answer of the Apps Script endpoint
#[derive(Clone, Debug, PartialEq)]
pub enum SheetPayload {
    Data(DataState),
    /// Any other shape; ignored by the controller
    Unrecognized,
}

/// Accepts `{status: "success", data: {...}}` and the legacy shape that puts
/// the collections (at least `subjects`) at the top level.
pub fn parse_sheet_response(result: Value) -> SheetPayload {
    let is_success = result.get("status").and_then(Value::as_str) == Some("success");
    let is_legacy = result.get("subjects").is_some();
    if !is_success && !is_legacy {
        return SheetPayload::Unrecognized;
    }

    let data = match result {
        Value::Object(mut object) => match object.remove("data") {
            Some(Value::Object(data)) => data,
            _ => object,
        },
        _ => return SheetPayload::Unrecognized,
    };
    SheetPayload::Data(DataState::from_object(data))
}

/// Checks the answer to a write; `status: "error"` is a rejection
pub fn parse_write_response(result: Value) -> Result<Value, SyncError> {
    match result.get("status").and_then(Value::as_str) {
        Some("error") => {
            let message = result
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            Err(SyncError::Rejected(message))
        }
        _ => Ok(result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_envelope_uses_data() {
        let payload = parse_sheet_response(json!({
            "status": "success",
            "data": {"students": [{"code": 1}], "subjects": []}
        }));
        match payload {
            SheetPayload::Data(state) => {
                assert_eq!(state.students().len(), 1);
                assert!(state.collection_names().all(|name| name != "status"));
            }
            SheetPayload::Unrecognized => panic!("expected data"),
        }
    }

    #[test]
    fn legacy_shape_is_the_data_itself() {
        let payload = parse_sheet_response(json!({
            "subjects": [{"id": "chinese-1"}],
            "classes": [{"id": "m4/1"}]
        }));
        match payload {
            SheetPayload::Data(state) => {
                assert_eq!(state.len(), 2);
                assert_eq!(state.collection("subjects")[0]["id"], "chinese-1");
            }
            SheetPayload::Unrecognized => panic!("expected data"),
        }
    }

    #[test]
    fn success_without_data_falls_back_to_top_level() {
        let payload = parse_sheet_response(json!({"status": "success", "students": []}));
        assert_eq!(
            payload,
            SheetPayload::Data(DataState::new().with_collection("students", vec![]))
        );
    }

    #[test]
    fn other_shapes_are_unrecognized() {
        assert_eq!(parse_sheet_response(json!({"status": "error"})), SheetPayload::Unrecognized);
        assert_eq!(parse_sheet_response(json!([1, 2, 3])), SheetPayload::Unrecognized);
        assert_eq!(parse_sheet_response(json!("ok")), SheetPayload::Unrecognized);
    }

    #[test]
    fn write_errors_become_rejections() {
        let rejected = parse_write_response(json!({"status": "error", "message": "duplicate"}));
        assert_eq!(rejected, Err(SyncError::Rejected("duplicate".to_string())));

        let ok = parse_write_response(json!({"status": "success", "id": 9})).unwrap();
        assert_eq!(ok["id"], 9);
    }
}

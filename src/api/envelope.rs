//! Unwrapping of the `{success, message, data}` response envelope.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ApiError;

const ENVELOPE_KEYS: &[&str] = &["data", "message", "success", "error", "meta"];

/// Returns the payload inside an envelope, or the value itself when it is not
/// enveloped. `success: false` turns into [`ApiError::Rejected`].
pub fn open(value: Value) -> Result<Value, ApiError> {
    let Value::Object(mut map) = value else {
        return Ok(value);
    };

    if map.get("success") == Some(&Value::Bool(false)) {
        let message = map
            .get("message")
            .or_else(|| map.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("backend reported failure")
            .to_string();
        return Err(ApiError::Rejected(message));
    }

    let is_envelope =
        map.contains_key("data") && map.keys().all(|k| ENVELOPE_KEYS.contains(&k.as_str()));
    if is_envelope {
        Ok(map.remove("data").unwrap_or(Value::Null))
    } else {
        Ok(Value::Object(map))
    }
}

/// Opens the envelope and decodes the payload.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    Ok(serde_json::from_value(open(value)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_success_envelope() {
        let v = open(json!({
            "success": true,
            "message": "Generation started",
            "data": {"job_id": 1, "product_ids": [2]}
        }))
        .unwrap();
        assert_eq!(v, json!({"job_id": 1, "product_ids": [2]}));
    }

    #[test]
    fn unwraps_plain_data_wrapper() {
        assert_eq!(open(json!({"data": {"id": 1}})).unwrap(), json!({"id": 1}));
    }

    #[test]
    fn bare_objects_pass_through() {
        let job = json!({"id": 1, "status": "PENDING"});
        assert_eq!(open(job.clone()).unwrap(), job);
    }

    #[test]
    fn paginated_bodies_are_not_unwrapped() {
        let page = json!({"data": [], "pagination": {"total": 0}});
        assert_eq!(open(page.clone()).unwrap(), page);
    }

    #[test]
    fn success_false_is_rejected() {
        let err = open(json!({"success": false, "message": "quota exceeded"})).unwrap_err();
        assert!(matches!(err, ApiError::Rejected(m) if m == "quota exceeded"));
    }

    #[test]
    fn decode_reports_shape_mismatch() {
        #[derive(Debug, serde::Deserialize)]
        struct Needs {
            #[allow(dead_code)]
            id: u64,
        }
        let err = decode::<Needs>(json!({"data": {"name": "x"}})).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}

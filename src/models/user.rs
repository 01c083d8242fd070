use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::device::Record;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub registration: Option<Value>,
    pub name: Option<Value>,
    /// Everything else is passed to the device untouched.
    #[serde(flatten)]
    pub extra: Record,
}

impl CreateUserRequest {
    /// Registration and name as text. Numbers are accepted and stringified.
    pub fn required(&self) -> Result<(String, String), String> {
        let registration = required_text("registration", self.registration.as_ref())?;
        let name = required_text("name", self.name.as_ref())?;
        Ok((registration, name))
    }
}

fn required_text(field: &str, value: Option<&Value>) -> Result<String, String> {
    match value {
        Some(Value::String(text)) if !text.is_empty() => Ok(text.clone()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        None | Some(Value::Null) | Some(Value::String(_)) => {
            Err(format!("Missing required field '{field}'"))
        }
        Some(_) => Err(format!("Field '{field}' must be a string or a number")),
    }
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub registration: String,
    pub device_user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub detail: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UserMapResponse {
    pub users: BTreeMap<String, i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extra_fields_exclude_required() {
        let req: CreateUserRequest = serde_json::from_value(json!({
            "registration": "1234",
            "name": "Test User",
            "user_type_id": 1,
            "begin_time": 0
        }))
        .unwrap();

        assert_eq!(
            req.required(),
            Ok(("1234".to_string(), "Test User".to_string()))
        );
        assert_eq!(req.extra.len(), 2);
        assert!(!req.extra.contains_key("registration"));
        assert_eq!(req.extra["user_type_id"], json!(1));
    }

    #[test]
    fn test_empty_required_field_rejected() {
        for body in [
            json!({ "registration": "", "name": "x" }),
            json!({ "registration": null, "name": "x" }),
            json!({ "name": "x" }),
        ] {
            let req: CreateUserRequest = serde_json::from_value(body).unwrap();
            assert_eq!(
                req.required(),
                Err("Missing required field 'registration'".to_string())
            );
        }
    }

    #[test]
    fn test_numeric_registration_is_stringified() {
        let req: CreateUserRequest =
            serde_json::from_value(json!({ "registration": 1234, "name": "x" })).unwrap();
        assert_eq!(req.required(), Ok(("1234".to_string(), "x".to_string())));
        assert!(req.extra.is_empty());
    }

    #[test]
    fn test_unsupported_required_type_is_named() {
        let req: CreateUserRequest =
            serde_json::from_value(json!({ "registration": "1234", "name": ["x"] })).unwrap();
        assert_eq!(
            req.required(),
            Err("Field 'name' must be a string or a number".to_string())
        );
    }
}

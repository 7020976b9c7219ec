//! Standard response envelope: `{status, message, data}`.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct Envelope<T> {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub type Reply<T> = (StatusCode, Json<Envelope<T>>);

fn envelope<T: Serialize>(code: StatusCode, message: impl Into<String>, data: Option<T>) -> Reply<T> {
    (
        code,
        Json(Envelope {
            status: "success",
            message: message.into(),
            data,
        }),
    )
}

pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> Reply<T> {
    envelope(StatusCode::CREATED, message, Some(data))
}

pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> Reply<T> {
    envelope(StatusCode::OK, message, Some(data))
}

/// Success without a payload (delete).
pub fn ok_empty(message: impl Into<String>) -> Reply<()> {
    envelope::<()>(StatusCode::OK, message, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_envelope_omits_data() {
        let (code, Json(body)) = ok_empty("Class level deleted successfully");
        assert_eq!(code, StatusCode::OK);
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["status"], "success");
        assert!(v.get("data").is_none());
    }

    #[test]
    fn created_uses_201() {
        let (code, Json(body)) = created("Program created successfully", serde_json::json!({"name": "x"}));
        assert_eq!(code, StatusCode::CREATED);
        assert_eq!(body.data.unwrap()["name"], "x");
    }
}

//! Request extractors whose rejections render as `{"detail": ...}` errors.

use axum::extract::{
    rejection::{JsonRejection, QueryRejection},
    FromRequest, FromRequestParts,
};
use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult};

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                Self::BadRequest(rejection.body_text())
            }
            _ => Self::UnprocessableEntity(rejection.body_text()),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Parses an optional JSON body; an empty body yields the default value.
pub fn optional_json<T>(body: &[u8]) -> AppResult<T>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|error| AppError::BadRequest(format!("Invalid JSON body: {error}")))
}

#[cfg(test)]
mod tests {
    use super::optional_json;
    use crate::{error::AppError, schemas::MarkInvoicePaidInput};

    #[test]
    fn empty_body_is_the_default_payload() {
        let payload: MarkInvoicePaidInput = optional_json(b"").expect("empty body");
        assert!(payload.method.is_none());
        let payload: MarkInvoicePaidInput = optional_json(b" \n").expect("blank body");
        assert!(payload.reference.is_none());
    }

    #[test]
    fn malformed_body_is_a_bad_request() {
        assert!(matches!(
            optional_json::<MarkInvoicePaidInput>(br#"{"method": 7}"#),
            Err(AppError::BadRequest(message)) if message.contains("Invalid JSON body")
        ));
        assert!(matches!(
            optional_json::<MarkInvoicePaidInput>(b"{"),
            Err(AppError::BadRequest(_))
        ));
    }
}

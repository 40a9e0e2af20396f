use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse};
use log::error;
use market_aggregator::StoreError;
use serde_json::json;

pub fn error_response(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(json!({
        "status": "error",
        "message": message.into()
    }))
}

/// Logs the underlying store failure and answers with a generic 500.
pub fn store_error_response(context: &str, err: &StoreError) -> HttpResponse {
    error!("{}: {}", context, err);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, context)
}

/// Malformed JSON bodies get the same error envelope as every other failure.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = error_response(StatusCode::BAD_REQUEST, err.to_string());
    InternalError::from_response(err, response).into()
}

/// First message attached to a failed validation rule.
pub fn validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}

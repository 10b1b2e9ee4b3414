use admission_evaluator::DecisionError;
use axum::{http::StatusCode, response::IntoResponse};
use serde_json::json;

#[derive(Debug)]
/// An error that can be returned by the API
/// and will be converted into a JSON response.
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl From<&DecisionError> for ApiError {
    fn from(error: &DecisionError) -> Self {
        let status = StatusCode::from_u16(error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = match error {
            DecisionError::Decode(_) => "cannot decode AdmissionReview request",
            DecisionError::MissingObject { .. } => "AdmissionReview request has no object",
            DecisionError::EmbeddedDecode { .. } => "cannot decode AdmissionReview object",
            DecisionError::Encode(_) => "Something went wrong",
        };

        Self {
            status,
            message: message.to_owned(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let payload = json!({
            "message": self.message,
            "status": self.status.as_u16(),
        });

        (self.status, axum::Json(payload)).into_response()
    }
}

use admission_evaluator::{
    admission_request::AdmissionRequest, admission_review::AdmissionReviewResponse,
    DecisionError, Evaluation,
};
use axum::{
    body::Bytes,
    extract,
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, Span};

use crate::{
    api::{api_error::ApiError, state::ApiServerState},
    metrics,
};

const JSON_CONTENT_TYPE: &str = "application/json";

#[tracing::instrument(
    name = "validation",
    fields(
        request_uid=tracing::field::Empty,
        host=crate::config::HOSTNAME.as_str(),
        name=tracing::field::Empty,
        namespace=tracing::field::Empty,
        operation=tracing::field::Empty,
        kind_group=tracing::field::Empty,
        kind_version=tracing::field::Empty,
        kind=tracing::field::Empty,
        rule=tracing::field::Empty,
        allowed=tracing::field::Empty,
        response_code=tracing::field::Empty,
        response_message=tracing::field::Empty,
    ),
    skip_all)]
/// Validate the AdmissionReview sent by the API server. The body is handed
/// to the decision engine as-is, its answer is written back verbatim.
pub(crate) async fn validate_handler(
    extract::State(state): extract::State<Arc<ApiServerState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let start_time = Instant::now();
    let engine = &state.engine;

    let admission_review = engine.decode(&body).map_err(handle_decision_error)?;
    populate_span_with_admission_request_data(&admission_review.request);

    let evaluation = engine
        .evaluate(&admission_review.request)
        .map_err(handle_decision_error)?;
    populate_span_with_evaluation_results(&evaluation);
    record_metrics(&admission_review.request, &evaluation, start_time);

    let response = AdmissionReviewResponse::new(evaluation.response);
    debug!(response =? &response, "admission review evaluated");
    let response_body = engine.encode(&response).map_err(handle_decision_error)?;

    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
        response_body,
    ))
}

pub(crate) async fn readiness_handler() -> StatusCode {
    StatusCode::OK
}

fn populate_span_with_admission_request_data(adm_req: &AdmissionRequest) {
    Span::current().record("kind", adm_req.kind.kind.as_str());
    Span::current().record("kind_group", adm_req.kind.group.as_str());
    Span::current().record("kind_version", adm_req.kind.version.as_str());
    Span::current().record("name", adm_req.name.clone().unwrap_or_default().as_str());
    Span::current().record(
        "namespace",
        adm_req.namespace.clone().unwrap_or_default().as_str(),
    );
    Span::current().record("operation", adm_req.operation.as_str());
    Span::current().record("request_uid", adm_req.uid.as_str());
}

fn populate_span_with_evaluation_results(evaluation: &Evaluation) {
    if let Some(rule) = &evaluation.rule {
        Span::current().record("rule", rule.as_str());
    }
    Span::current().record("allowed", evaluation.response.allowed);
    if let Some(status) = &evaluation.response.status {
        if let Some(code) = &status.code {
            Span::current().record("response_code", code);
        }
        if let Some(message) = &status.message {
            Span::current().record("response_message", message.as_str());
        }
    }
}

fn record_metrics(adm_req: &AdmissionRequest, evaluation: &Evaluation, start_time: Instant) {
    let admission_evaluation = metrics::AdmissionEvaluation {
        rule_name: evaluation.rule.clone(),
        resource_kind: adm_req.kind.kind.clone(),
        resource_namespace: adm_req.namespace.clone(),
        resource_request_operation: adm_req.operation.clone(),
        accepted: evaluation.response.allowed,
        error_code: evaluation
            .response
            .status
            .as_ref()
            .and_then(|status| status.code),
    };
    metrics::record_admission_latency(start_time.elapsed(), &admission_evaluation);
    metrics::add_admission_evaluation(&admission_evaluation);
}

fn handle_decision_error(error: DecisionError) -> ApiError {
    let api_error = ApiError::from(&error);
    Span::current().record("response_code", api_error.status.as_u16());
    if api_error.status.is_server_error() {
        error!("Decision error: {}", error);
    } else {
        debug!("Rejected malformed request: {}", error);
    }

    api_error
}

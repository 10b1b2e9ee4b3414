use tracing::{debug, error, info, warn};

use crate::admission_request::AdmissionRequest;
use crate::admission_response::AdmissionResponse;
use crate::admission_review::{AdmissionReviewRequest, AdmissionReviewResponse};
use crate::errors::{DecisionError, Result};
use crate::policy::{PolicyTable, Verdict};
use crate::resource::Resource;

/// Result of the evaluation of a single AdmissionRequest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub response: AdmissionResponse,
    /// Name of the rule that handled the request, `None` when the kind of
    /// the request is not inspected by any rule.
    pub rule: Option<String>,
}

/// Turns AdmissionReview requests into AdmissionReview responses.
///
/// The engine holds only its immutable policy table, it can be shared
/// between any number of concurrent callers.
#[derive(Debug, Default)]
pub struct DecisionEngine {
    policies: PolicyTable,
}

impl DecisionEngine {
    pub fn new(policies: PolicyTable) -> Self {
        DecisionEngine { policies }
    }

    /// Decode a raw AdmissionReview, evaluate it and return the encoded
    /// AdmissionReview response that has to be written back verbatim.
    pub fn decide(&self, body: &[u8]) -> Result<Vec<u8>> {
        let review = self.decode(body)?;
        let evaluation = self.evaluate(&review.request)?;
        self.encode(&AdmissionReviewResponse::new(evaluation.response))
    }

    pub fn decode(&self, body: &[u8]) -> Result<AdmissionReviewRequest> {
        serde_json::from_slice(body).map_err(|e| {
            warn!(error = %e, "cannot decode AdmissionReview request");
            DecisionError::Decode(e)
        })
    }

    pub fn encode(&self, review: &AdmissionReviewResponse) -> Result<Vec<u8>> {
        serde_json::to_vec(review).map_err(|e| {
            error!(
                request_uid = review.response.uid.as_str(),
                error = %e,
                "cannot encode AdmissionReview response"
            );
            DecisionError::Encode(e)
        })
    }

    pub fn review(&self, review: AdmissionReviewRequest) -> Result<AdmissionReviewResponse> {
        let evaluation = self.evaluate(&review.request)?;
        Ok(AdmissionReviewResponse::new(evaluation.response))
    }

    pub fn evaluate(&self, request: &AdmissionRequest) -> Result<Evaluation> {
        info!(
            request_uid = request.uid.as_str(),
            kind = request.kind.kind.as_str(),
            operation = request.operation.as_str(),
            "received admission review request"
        );

        let response = AdmissionResponse::allow(request.uid.clone());

        let Some(rule) = self.policies.rule_for(&request.kind) else {
            debug!(
                request_uid = request.uid.as_str(),
                kind = request.kind.kind.as_str(),
                "kind not inspected by any rule, allowing"
            );
            return Ok(Evaluation {
                response,
                rule: None,
            });
        };

        let raw = request.object.as_ref().ok_or_else(|| {
            warn!(
                request_uid = request.uid.as_str(),
                kind = request.kind.kind.as_str(),
                "admission review request without object"
            );
            DecisionError::MissingObject {
                uid: request.uid.clone(),
                kind: request.kind.kind.clone(),
            }
        })?;

        let resource = Resource::from_raw(raw).map_err(|e| {
            warn!(
                request_uid = request.uid.as_str(),
                kind = request.kind.kind.as_str(),
                namespace = request.namespace.as_deref().unwrap_or_default(),
                name = request.name.as_deref().unwrap_or_default(),
                error = %e,
                "cannot decode embedded object"
            );
            DecisionError::EmbeddedDecode {
                uid: request.uid.clone(),
                kind: request.kind.kind.clone(),
                source: e,
            }
        })?;

        let response = match rule.evaluate(&resource) {
            Verdict::Allow => {
                info!(
                    request_uid = request.uid.as_str(),
                    rule = rule.name.as_str(),
                    kind = request.kind.kind.as_str(),
                    namespace = resource.namespace(),
                    name = resource.name(),
                    "resource allowed"
                );
                response
            }
            Verdict::Deny(denial) => {
                info!(
                    request_uid = request.uid.as_str(),
                    rule = rule.name.as_str(),
                    kind = request.kind.kind.as_str(),
                    namespace = resource.namespace(),
                    name = resource.name(),
                    message = denial.message.as_str(),
                    "resource rejected"
                );
                AdmissionResponse::reject(response.uid, denial)
            }
        };

        Ok(Evaluation {
            response,
            rule: Some(rule.name.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission_response::{AdmissionResponseStatus, StatusReason};
    use crate::policy::{KindMatcher, PolicyRule, RequireAnnotation};
    use assert_json_diff::assert_json_eq;
    use rstest::*;
    use serde_json::json;

    fn admission_review(uid: &str, kind: &str, object: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": uid,
                "kind": {"group": "", "version": "v1", "kind": kind},
                "resource": {"group": "", "version": "v1", "resource": "pods"},
                "name": "nginx",
                "namespace": "default",
                "operation": "CREATE",
                "userInfo": {"username": "admin"},
                "object": object,
                "dryRun": false
            }
        }))
        .unwrap()
    }

    fn object_with_labels(labels: serde_json::Value) -> serde_json::Value {
        json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": "nginx",
                "namespace": "default",
                "labels": labels
            },
            "spec": {"containers": [{"name": "nginx", "image": "nginx:latest"}]}
        })
    }

    fn decide(engine: &DecisionEngine, body: &[u8]) -> AdmissionReviewResponse {
        let encoded = engine.decide(body).expect("decision should succeed");
        serde_json::from_slice(&encoded).expect("response should be valid JSON")
    }

    #[rstest]
    #[case::app_label("Pod", json!({"app": "frontend"}), true)]
    #[case::no_labels("Pod", json!({}), false)]
    #[case::empty_app_label("Pod", json!({"app": ""}), true)]
    #[case::other_labels_only("Pod", json!({"tier": "web", "application": "x"}), false)]
    #[case::unrecognized_kind("ConfigMap", json!({}), true)]
    #[case::unrecognized_kind_with_app("ConfigMap", json!({"app": "x"}), true)]
    fn label_predicate(
        #[case] kind: &str,
        #[case] labels: serde_json::Value,
        #[case] expected_allowed: bool,
    ) {
        let engine = DecisionEngine::default();
        let body = admission_review("uid-1", kind, object_with_labels(labels));

        let review = decide(&engine, &body);

        assert_eq!(review.response.uid, "uid-1");
        assert_eq!(review.response.allowed, expected_allowed);
        if expected_allowed {
            assert_eq!(review.response.status, None);
        } else {
            assert_eq!(
                review.response.status,
                Some(AdmissionResponseStatus {
                    message: Some("Pod rejected: missing 'app' label.".to_string()),
                    reason: Some(StatusReason::Forbidden),
                    code: Some(403),
                })
            );
        }
    }

    #[test]
    fn rejection_echoes_uid_and_envelope() {
        let engine = DecisionEngine::default();
        let body = admission_review("abc-123", "Pod", object_with_labels(json!({})));

        let encoded = engine.decide(&body).unwrap();

        assert_json_eq!(
            serde_json::from_slice::<serde_json::Value>(&encoded).unwrap(),
            json!({
                "apiVersion": "admission.k8s.io/v1",
                "kind": "AdmissionReview",
                "response": {
                    "uid": "abc-123",
                    "allowed": false,
                    "status": {
                        "message": "Pod rejected: missing 'app' label.",
                        "reason": "Forbidden",
                        "code": 403
                    }
                }
            })
        );
    }

    #[test]
    fn allowed_envelope_has_same_discriminators() {
        let engine = DecisionEngine::default();
        let body = admission_review("abc-123", "ConfigMap", json!({"data": {}}));

        let encoded = engine.decide(&body).unwrap();

        assert_json_eq!(
            serde_json::from_slice::<serde_json::Value>(&encoded).unwrap(),
            json!({
                "apiVersion": "admission.k8s.io/v1",
                "kind": "AdmissionReview",
                "response": {"uid": "abc-123", "allowed": true}
            })
        );
    }

    #[test]
    fn pod_without_metadata_is_rejected() {
        let engine = DecisionEngine::default();
        let body = admission_review("uid", "Pod", json!({"apiVersion": "v1", "kind": "Pod"}));

        assert!(!decide(&engine, &body).response.allowed);
    }

    #[rstest]
    #[case::null_metadata(json!({"kind": "Pod", "metadata": null}), false)]
    #[case::null_labels(json!({"metadata": {"labels": null}}), false)]
    #[case::null_app_label(json!({"metadata": {"labels": {"app": null}}}), true)]
    #[case::null_other_label(json!({"metadata": {"labels": {"tier": null}}}), false)]
    fn null_metadata_fields_get_a_verdict(
        #[case] object: serde_json::Value,
        #[case] expected_allowed: bool,
    ) {
        let engine = DecisionEngine::default();
        let body = serde_json::to_vec(&json!({
            "request": {"uid": "u", "kind": {"kind": "Pod"}, "object": object}
        }))
        .unwrap();

        let review = decide(&engine, &body);

        assert_eq!(review.response.uid, "u");
        assert_eq!(review.response.allowed, expected_allowed);
    }

    #[test]
    fn minimal_request_is_accepted() {
        let engine = DecisionEngine::default();
        let body = br#"{"request": {"uid": "only-uid"}}"#;

        let review = decide(&engine, body);

        assert_eq!(review.response.uid, "only-uid");
        assert!(review.response.allowed);
    }

    #[rstest]
    #[case::truncated_json(br#"{"request": {"uid": "abc"#.as_slice())]
    #[case::not_json(b"hello world".as_slice())]
    #[case::empty_body(b"".as_slice())]
    #[case::missing_request(br#"{"apiVersion": "admission.k8s.io/v1"}"#.as_slice())]
    #[case::missing_uid(br#"{"request": {"kind": {"kind": "Pod"}}}"#.as_slice())]
    fn malformed_envelope(#[case] body: &[u8]) {
        let engine = DecisionEngine::default();

        let error = engine.decide(body).unwrap_err();

        assert!(matches!(error, DecisionError::Decode(_)));
        assert_eq!(error.status_code(), 400);
    }

    #[test]
    fn malformed_embedded_object_of_inspected_kind() {
        let engine = DecisionEngine::default();
        let body = admission_review("uid", "Pod", json!({"metadata": {"labels": "app"}}));

        let error = engine.decide(&body).unwrap_err();

        assert!(matches!(error, DecisionError::EmbeddedDecode { .. }));
        assert_eq!(error.status_code(), 400);
    }

    #[test]
    fn malformed_embedded_object_of_ignored_kind() {
        let engine = DecisionEngine::default();
        let body = admission_review("uid", "ConfigMap", json!({"metadata": {"labels": "app"}}));

        assert!(decide(&engine, &body).response.allowed);
    }

    #[rstest]
    #[case::null_object(json!(null))]
    fn missing_embedded_object(#[case] object: serde_json::Value) {
        let engine = DecisionEngine::default();
        let body = admission_review("uid", "Pod", object);

        let error = engine.decide(&body).unwrap_err();

        assert!(matches!(error, DecisionError::MissingObject { .. }));
        assert_eq!(error.status_code(), 400);
    }

    #[test]
    fn absent_embedded_object() {
        let engine = DecisionEngine::default();
        let body = br#"{"request": {"uid": "uid", "kind": {"group": "", "version": "v1", "kind": "Pod"}}}"#;

        let error = engine.decide(body).unwrap_err();

        assert!(matches!(error, DecisionError::MissingObject { .. }));
    }

    #[test]
    fn evaluation_reports_the_matching_rule() {
        let engine = DecisionEngine::new(PolicyTable::new(vec![PolicyRule::new(
            "owners",
            KindMatcher::kind("Pod"),
            Box::new(RequireAnnotation::new("owner")),
        )]));
        let review = engine
            .decode(&admission_review("uid", "Pod", object_with_labels(json!({}))))
            .unwrap();

        let evaluation = engine.evaluate(&review.request).unwrap();

        assert_eq!(evaluation.rule.as_deref(), Some("owners"));
        assert_eq!(
            evaluation
                .response
                .status
                .and_then(|status| status.message),
            Some("Pod rejected: missing 'owner' annotation.".to_string())
        );
    }

    #[test]
    fn typed_review_matches_raw_decision() {
        let engine = DecisionEngine::default();
        let body = admission_review("uid", "Pod", object_with_labels(json!({"app": "a"})));
        let request = engine.decode(&body).unwrap();

        let typed = engine.review(request).unwrap();

        assert_eq!(typed, decide(&engine, &body));
    }
}

use serde::{Deserialize, Serialize};

use crate::policy::Denial;

/// This models the admission/v1/AdmissionResponse object of Kubernetes,
/// restricted to what a validating webhook produces.
/// See https://pkg.go.dev/k8s.io/api/admission/v1#AdmissionResponse
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    /// UID is an identifier for the individual request/response.
    /// This must be copied over from the corresponding AdmissionRequest.
    pub uid: String,

    /// Allowed indicates whether or not the admission request was permitted.
    pub allowed: bool,

    /// Status contains extra details into why an admission request was denied.
    /// It is only set when `allowed` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AdmissionResponseStatus>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone)]
pub struct AdmissionResponseStatus {
    /// A human-readable description of the status of this operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// A machine-readable description of why this operation is in the
    /// "Failure" status. A Reason clarifies an HTTP status code but does
    /// not override it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<StatusReason>,

    /// Suggested HTTP return code for this status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

impl AdmissionResponse {
    /// The default-permit baseline every evaluation starts from.
    pub fn allow(uid: String) -> AdmissionResponse {
        AdmissionResponse {
            uid,
            allowed: true,
            status: None,
        }
    }

    pub fn reject(uid: String, denial: Denial) -> AdmissionResponse {
        AdmissionResponse {
            uid,
            allowed: false,
            status: Some(AdmissionResponseStatus {
                message: Some(denial.message),
                reason: Some(denial.reason),
                code: Some(denial.code),
            }),
        }
    }
}

/// StatusReason is an enumeration of possible failure causes.
/// Each StatusReason must map to a single HTTP status code, but multiple reasons may map to the same
/// HTTP status code.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub enum StatusReason {
    /// StatusReasonForbidden means the server can be reached and understood the request, but
    /// refuses to take any further action. This is the result of the server being configured to
    /// deny access for some reason to the requested resource by the client.
    /// Status code 403.
    Forbidden,
}

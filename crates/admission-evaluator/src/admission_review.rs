use crate::admission_request::AdmissionRequest;
use crate::admission_response::AdmissionResponse;
use crate::constants::{ADMISSION_REVIEW_API_VERSION, ADMISSION_REVIEW_KIND};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReviewRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    pub request: AdmissionRequest,
}

/// The envelope sent back to the API server. The type discriminator fields
/// are always emitted, regardless of the verdict.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReviewResponse {
    pub kind: String,

    pub api_version: String,

    pub response: AdmissionResponse,
}

impl AdmissionReviewResponse {
    pub fn new(response: AdmissionResponse) -> Self {
        AdmissionReviewResponse {
            api_version: String::from(ADMISSION_REVIEW_API_VERSION),
            kind: String::from(ADMISSION_REVIEW_KIND),
            response,
        }
    }
}

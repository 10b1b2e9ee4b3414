pub const ADMISSION_REVIEW_API_VERSION: &str = "admission.k8s.io/v1";
pub const ADMISSION_REVIEW_KIND: &str = "AdmissionReview";

pub const POD_KIND: &str = "Pod";
pub const APP_LABEL: &str = "app";
pub const DEFAULT_RULE_NAME: &str = "pods-require-app-label";

/// HTTP status code suggested to the API server for every policy denial
pub const DENIAL_CODE: u16 = 403;

extern crate k8s_openapi;

pub mod admission_request;
pub mod admission_response;
pub mod admission_review;
pub mod constants;
pub mod decision_engine;
pub mod errors;
pub mod policy;
pub mod resource;

pub use decision_engine::{DecisionEngine, Evaluation};
pub use errors::{DecisionError, PolicyConfigError};

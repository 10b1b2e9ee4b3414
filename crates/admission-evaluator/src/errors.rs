use thiserror::Error;

pub type Result<T> = std::result::Result<T, DecisionError>;

/// Faults that abort a single admission call. A policy denial is not one of
/// them: it is a successful call carrying a negative verdict.
#[derive(Error, Debug)]
pub enum DecisionError {
    #[error("cannot decode AdmissionReview request: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("AdmissionReview request {uid} has no {kind} object to evaluate")]
    MissingObject { uid: String, kind: String },

    #[error("cannot decode {kind} object of AdmissionReview request {uid}: {source}")]
    EmbeddedDecode {
        uid: String,
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot encode AdmissionReview response: {0}")]
    Encode(#[source] serde_json::Error),
}

impl DecisionError {
    /// The HTTP status the transport layer must answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            DecisionError::Decode(_)
            | DecisionError::MissingObject { .. }
            | DecisionError::EmbeddedDecode { .. } => 400,
            DecisionError::Encode(_) => 500,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PolicyConfigError {
    #[error("policy rule name cannot be empty")]
    EmptyRuleName,

    #[error("policy rule \"{0}\" is defined more than once")]
    DuplicateRuleName(String),

    #[error("policy rule \"{0}\" must specify a kind")]
    EmptyKind(String),

    #[error("policy rule \"{0}\" must specify a non empty key")]
    EmptyKey(String),
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("failed to load rules: {0}")]
    RulesLoad(String),

    #[error("invalid rule table: {0}")]
    RulesValidation(String),

    #[error("invalid tool invocation: {0}")]
    InvalidInvocation(String),
}

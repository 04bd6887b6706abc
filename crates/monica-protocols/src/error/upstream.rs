//! Failures reported by the upstream generative-AI service.

use thiserror::Error;

/// Known upstream failure signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    RateLimited,
    InvalidCredential,
    SafetyBlocked,
    Unknown,
}

impl UpstreamErrorKind {
    /// Classify a raw upstream error message.
    pub fn classify(message: &str) -> Self {
        let message = message.to_lowercase();
        if message.contains("429") || message.contains("resource_exhausted") {
            UpstreamErrorKind::RateLimited
        } else if message.contains("api key not valid") {
            UpstreamErrorKind::InvalidCredential
        } else if message.contains("candidate was blocked due to safety") {
            UpstreamErrorKind::SafetyBlocked
        } else {
            UpstreamErrorKind::Unknown
        }
    }

    /// Message shown to the user for this kind of failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            UpstreamErrorKind::RateLimited => {
                "The AI model is currently overloaded or your API key has exceeded its rate limit. \
                 Check your plan and billing details, or wait a moment and try again."
            }
            UpstreamErrorKind::InvalidCredential => {
                "The provided API key is invalid. Check your global or per-agent settings."
            }
            UpstreamErrorKind::SafetyBlocked => {
                "The response was blocked due to safety settings. Adjust your prompt or the \
                 model's safety configuration."
            }
            UpstreamErrorKind::Unknown => {
                "An unexpected error occurred while communicating with the AI. Check the logs for details."
            }
        }
    }
}

/// An upstream failure, carrying whatever part of the response arrived before it.
#[derive(Debug, Clone, Error)]
#[error("Upstream error in {context}: {message}")]
pub struct UpstreamError {
    /// Raw error message from the service.
    pub message: String,
    /// Where the failure happened (e.g. "streaming reply").
    pub context: String,
    /// Partially streamed response, kept for recovery.
    pub partial_response: Option<String>,
}

impl UpstreamError {
    pub fn new(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: context.into(),
            partial_response: None,
        }
    }

    /// Attach the partially streamed response.
    pub fn with_partial_response(mut self, partial: impl Into<String>) -> Self {
        self.partial_response = Some(partial.into());
        self
    }

    pub fn kind(&self) -> UpstreamErrorKind {
        UpstreamErrorKind::classify(&self.message)
    }

    pub fn user_message(&self) -> &'static str {
        self.kind().user_message()
    }
}

//! Evaluation capability supplied by the host.

use thiserror::Error;

use crate::network::Network;

/// Human-readable failure reported by an [`Evaluator`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EvaluationError {
    message: String,
}

impl EvaluationError {
    /// Builds an error carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Message returned to the client.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Evaluates expression commands against the network.
///
/// `Ok(None)` is a null result; `Ok(Some(text))` carries the string form of
/// the value.
pub trait Evaluator: Send + Sync {
    /// Evaluates `expression`.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError`] when the expression cannot be evaluated.
    fn evaluate(
        &self,
        expression: &str,
        network: &dyn Network,
    ) -> Result<Option<String>, EvaluationError>;
}

impl<F> Evaluator for F
where
    F: Fn(&str, &dyn Network) -> Result<Option<String>, EvaluationError> + Send + Sync,
{
    fn evaluate(
        &self,
        expression: &str,
        network: &dyn Network,
    ) -> Result<Option<String>, EvaluationError> {
        self(expression, network)
    }
}

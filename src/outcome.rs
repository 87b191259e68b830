use crate::error::TopomapError;

/// Result of one processing step.
///
/// `Invalid` is expected input the step refuses (never retried); `Fault` is
/// an unexpected failure while handling input the step accepted.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    Invalid(String),
    Fault(TopomapError),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Outcome::Invalid(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }
}

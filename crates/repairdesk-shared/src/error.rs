use thiserror::Error;

/// A single failed validation rule. The display text is the message shown to
/// the person filling in the form.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    #[error("Name is required (min 2 chars).")]
    Name,

    #[error("Valid email required.")]
    Email,

    #[error("Device model is required.")]
    DeviceModel,

    #[error("Problem description (min 10 chars).")]
    ProblemDescription,

    #[error("Priority must be Low, Medium or High.")]
    Priority,
}

/// Every rule a submission failed, in rule order. Never empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Validation failed ({} rule(s))", .0.len())]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Returns `None` when there is nothing to report.
    pub fn from_vec(errors: Vec<FieldError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn contains(&self, error: FieldError) -> bool {
        self.0.contains(&error)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Human-readable messages, one per failed rule.
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

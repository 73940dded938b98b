//! The acceptance rules for a repair request.
//!
//! Every rule runs on every submission and failures accumulate, so the form
//! can show all problems at once. The email rule is a shape check only
//! (`something@something.something`), not address validation.

use std::sync::OnceLock;

use regex::Regex;

use crate::constants::{MIN_DESCRIPTION_LEN, MIN_NAME_LEN};
use crate::error::{FieldError, ValidationErrors};
use crate::types::{Priority, RawSubmission, SubmissionDraft};

fn email_shape() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern is valid"))
}

fn trimmed(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or("")
}

pub fn is_valid_email(email: &str) -> bool {
    email_shape().is_match(email)
}

/// Check `raw` against every rule. On success all text is trimmed, an empty
/// phone becomes `None` and a missing priority becomes [`Priority::Low`].
pub fn validate(raw: &RawSubmission) -> Result<SubmissionDraft, ValidationErrors> {
    let mut errors = Vec::new();

    let name = trimmed(&raw.name);
    if name.chars().count() < MIN_NAME_LEN {
        errors.push(FieldError::Name);
    }

    let email = trimmed(&raw.email);
    if !is_valid_email(email) {
        errors.push(FieldError::Email);
    }

    let device_model = trimmed(&raw.device_model);
    if device_model.is_empty() {
        errors.push(FieldError::DeviceModel);
    }

    let problem_description = trimmed(&raw.problem_description);
    if problem_description.chars().count() < MIN_DESCRIPTION_LEN {
        errors.push(FieldError::ProblemDescription);
    }

    let priority = match trimmed(&raw.priority) {
        "" => Some(Priority::default()),
        value => value.parse::<Priority>().ok(),
    };
    if priority.is_none() {
        errors.push(FieldError::Priority);
    }

    if let Some(errors) = ValidationErrors::from_vec(errors) {
        return Err(errors);
    }

    let phone = Some(trimmed(&raw.phone))
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    Ok(SubmissionDraft {
        name: name.to_string(),
        email: email.to_string(),
        phone,
        device_model: device_model.to_string(),
        problem_description: problem_description.to_string(),
        priority: priority.unwrap_or_default(),
    })
}

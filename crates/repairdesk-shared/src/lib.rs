//! # repairdesk-shared
//!
//! Types and rules shared by every component that touches a repair request:
//! the submission record model, the validator that decides which input may
//! become a record, and the clock that stamps ids and attachment names.
//!
//! The validator is pure so a form front end can run the exact rule set the
//! server enforces.

pub mod clock;
pub mod constants;
pub mod error;
pub mod types;
pub mod validation;

pub use error::{FieldError, ValidationErrors};
pub use types::{Priority, RawSubmission, SubmissionDraft, SubmissionRecord};
pub use validation::validate;

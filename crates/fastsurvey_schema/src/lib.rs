//! Survey Schema System
//!
//! # Configuration, then Validator
//!
//! A survey owner writes a declarative, recursive configuration. It is
//! compiled once into a [`Validator`]: an immutable tree of typed fields with
//! their constraint rules attached. Every submission is checked against that
//! tree before anything is persisted.
//!
//! - Unknown or misplaced constraints fail compilation; nothing is silently
//!   ignored.
//! - Every configured field is required in a submission.
//! - All violations are reported together, keyed by field path.
//!
//! # Modules
//!
//! - [`field`]: configuration document types (FieldModel, SurveyConfiguration)
//! - [`rules`]: the constraint rule registry
//! - [`compiler`]: configuration -> validator
//! - [`validator`]: submission checking
//! - [`violation`]: field-level violation reports

pub mod compiler;
pub mod field;
pub mod rules;
pub mod validator;
pub mod violation;

pub use compiler::{compile, ConfigurationError};
pub use field::{FieldKind, FieldModel, FieldProperties, SurveyConfiguration};
pub use rules::{Rule, DEFAULT_EMAIL_PATTERN};
pub use validator::{validate, CompiledField, Submission, Validator};
pub use violation::{FieldViolation, Violations};

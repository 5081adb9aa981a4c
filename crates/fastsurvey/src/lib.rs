//! FastSurvey service core
//!
//! Ties compiled survey validators to the submission store:
//!
//! - [`Survey`]: submit, verify and retention for one survey
//! - [`SurveyRegistry`]: routes requests to surveys by key
//! - [`ServiceConfig`]: on-disk service configuration

pub mod config;
pub mod error;
pub mod registry;
pub mod retention;
pub mod survey;

pub use config::{ConfigError, ServiceConfig};
pub use error::{Result, SurveyError};
pub use registry::SurveyRegistry;
pub use retention::{KeepAll, MaxAge, RetentionPolicy};
pub use survey::{Receipt, Survey};

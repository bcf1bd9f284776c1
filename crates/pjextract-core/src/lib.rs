//! Core of pjextract: domain types, access-token claims, paginated
//! collection, table formatting and the sequential multi-instance run.
//!
//! Browser automation and HTTP live behind the [`Authenticator`] and
//! [`PageSource`] traits so this crate stays free of I/O engines.

pub mod collect;
pub mod error;
pub mod format;
pub mod model;
pub mod progress;
pub mod run;
pub mod session;
pub mod settings;
pub mod token;

pub use collect::{Collected, PageSource, StopReason, collect};
pub use error::{AuthError, ConfigError, FormatError, PageFetchError};
pub use format::format_records;
pub use model::{
    AuthSession, Category, Credentials, ExtractionMode, InstanceId, InstanceSelection,
    ProcessRecord, ResultSet,
};
pub use progress::{NullProgress, Progress};
pub use run::{Authenticator, CategoryTally, InstanceOutcome, Orchestrator, RunReport, RunRequest};
pub use settings::Settings;
pub use token::decode_claims;

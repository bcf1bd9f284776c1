//! Browser side of pjextract: drives Chromium through the PJe login flows
//! and hands the resulting session to the collector.

mod authenticator;
pub mod login;
pub mod wait;

pub use authenticator::{BrowserAuthenticator, BrowserOptions};
pub use login::{LoginFlow, LoginTimeouts};

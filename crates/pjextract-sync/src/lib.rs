//! Remote access layer: the reqwest-backed [`PageSource`](pjextract_core::PageSource)
//! used against live PJe instances.

pub mod http;

pub use http::PanelClient;

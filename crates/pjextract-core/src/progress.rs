//! Progress reporting for long runs. Front ends implement [`Progress`] to
//! surface status to users; every hook has a no-op default.

use crate::model::{Category, InstanceId};

pub trait Progress: Send {
    /// Called once with the number of instances to process.
    fn run_started(&mut self, _total: usize) {}

    /// `position` is 1-based.
    fn instance_started(&mut self, _instance: InstanceId, _position: usize, _total: usize) {}

    fn login_succeeded(&mut self, _instance: InstanceId) {}

    fn login_failed(&mut self, _instance: InstanceId, _reason: &str) {}

    /// A non-empty page arrived; `total` counts records of this category so far.
    fn page_fetched(&mut self, _instance: InstanceId, _category: Category, _page: u32, _total: usize) {}

    fn category_finished(&mut self, _instance: InstanceId, _category: Category, _records: usize) {}

    /// `fraction` is instances completed over instances selected.
    fn instance_finished(&mut self, _instance: InstanceId, _fraction: f32) {}

    /// Free-form status line for human eyes.
    fn message(&mut self, _msg: &str) {}

    fn warning(&mut self, _msg: &str) {}

    fn run_finished(&mut self, _collected: usize) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}

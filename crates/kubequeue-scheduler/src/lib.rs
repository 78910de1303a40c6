//! Job admission and reaping for kubequeue.
//!
//! On every enqueue the dispatcher sweeps finished jobs and pods, checks the
//! group's running count against its cap, and submits a normalized job when
//! there is room. There is no locking around the admission check, so
//! concurrent producers can overshoot the cap.

pub mod admission;
pub mod dispatcher;
pub mod hook;
pub mod reaper;

pub use admission::AdmissionController;
pub use dispatcher::{Dispatcher, JobSubmitter};
pub use hook::EnqueueHook;
pub use reaper::{ReapReport, SweepReport};

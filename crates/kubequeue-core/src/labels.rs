//! Marker labels and the selectors built from them.

use derive_more::Display;
use std::collections::BTreeMap;

/// Label carried by every managed job and pod.
pub const MANAGED_LABEL: &str = "managed-job";
/// Label carrying a job's group (its declared name).
pub const GROUP_LABEL: &str = "managed-job-group";
/// Value of [`MANAGED_LABEL`] on jobs.
pub const JOB_MARKER: &str = "job";
/// Value of [`MANAGED_LABEL`] on pod templates.
pub const POD_MARKER: &str = "pod";

/// An equality-based label selector, e.g. `managed-job=job,managed-job-group=render`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{_0}")]
pub struct LabelSelector(String);

impl LabelSelector {
    /// Selects every managed job.
    pub fn jobs() -> Self {
        Self(format!("{MANAGED_LABEL}={JOB_MARKER}"))
    }

    /// Selects every managed pod.
    pub fn pods() -> Self {
        Self(format!("{MANAGED_LABEL}={POD_MARKER}"))
    }

    /// Selects the managed jobs belonging to one group.
    pub fn job_group(group: &str) -> Self {
        Self(format!("{MANAGED_LABEL}={JOB_MARKER},{GROUP_LABEL}={group}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `key=value` requirements making up this selector.
    pub fn requirements(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .split(',')
            .filter_map(|req| req.split_once('='))
    }

    /// Whether a label set satisfies every requirement.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements()
            .all(|(key, value)| labels.get(key).is_some_and(|v| v == value))
    }
}

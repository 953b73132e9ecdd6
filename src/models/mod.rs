pub mod job;
pub mod metrics;

pub use job::{JobId, JobSnapshot, JobStarted};
pub use metrics::{DeviceProfile, DomainOutcome, DomainResult, MetricPair, MetricSet};

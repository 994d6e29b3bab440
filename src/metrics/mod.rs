/// Host metrics: the snapshot payload and the sources that produce it
pub mod snapshot;
pub mod source;

pub use snapshot::MetricsSnapshot;
pub use source::{SnapshotSource, SystemSnapshotSource};

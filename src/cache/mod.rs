mod snapshot;

pub use snapshot::{CacheError, SnapshotCache};

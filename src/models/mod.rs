mod record;
mod view;

pub use record::{cache_key, CanonicalRecord, PartialRecord, TxnCounts, Windowed};
pub use view::{InvalidParameter, SortKey, ViewRecord, Window};

use crate::cache::SnapshotCache;
use crate::pubsub::Broadcaster;
use crate::view::ViewState;

/// Handles shared by the sweep loop and the request surface.
///
/// Every field is internally reference counted, so clones share state.
#[derive(Clone, Default)]
pub struct AppState {
    pub cache: SnapshotCache,
    pub view_state: ViewState,
    pub broadcaster: Broadcaster,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

//! Job that pushes the current view to every connected observer.

use log::info;
use serde::Serialize;

use crate::app::AppState;
use crate::pubsub::PushReport;
use crate::view::{self, View};

/// Wire shape of a broadcast: `{"tokens": [...]}`.
#[derive(Debug, Serialize)]
pub struct BroadcastMessage<'a> {
    pub tokens: &'a View,
}

/// Scans the cache, renders it with one consistent copy of the view
/// settings and fans it out.
pub async fn run(state: &AppState) -> PushReport {
    let settings = state.view_state.snapshot().await;
    let view = view::compute(state.cache.scan_all(), settings);

    let report = state
        .broadcaster
        .push(&BroadcastMessage { tokens: &view })
        .await;

    info!(
        "Broadcast {} tokens (window: {}, sort: {}) to {} observers ({} closed, {} lagging)",
        view.len(),
        settings.window.map_or("unset", |w| w.as_str()),
        settings.sort_key.map_or("unset", |k| k.as_str()),
        report.delivered,
        report.closed,
        report.lagging
    );

    report
}

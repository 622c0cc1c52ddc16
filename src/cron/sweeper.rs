use std::sync::Arc;

use crate::app::AppState;
use crate::config::{SweepSettings, TrackedToken};
use crate::pubsub::PushReport;
use crate::sources::MarketFeed;

use super::jobs::refresh_tokens::{InFlight, SweepReport, TokenRefresher};
use super::jobs::broadcast_view;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub sweep: SweepReport,
    pub push: PushReport,
}

/// One sweep-then-broadcast cycle.
///
/// Overlap is handled per token: a tick skips only the tokens whose
/// previous refresh is still running, refreshes the rest and always
/// broadcasts.
pub struct Sweeper {
    refresher: TokenRefresher,
    state: AppState,
    tokens: Arc<[TrackedToken]>,
}

impl Sweeper {
    pub fn new(
        feed: Arc<dyn MarketFeed>,
        state: AppState,
        tokens: Vec<TrackedToken>,
        settings: SweepSettings,
    ) -> Self {
        Self {
            refresher: TokenRefresher::new(feed, state.cache.clone(), &settings),
            state,
            tokens: tokens.into(),
        }
    }

    /// Tokens whose refresh is still running.
    pub fn in_flight(&self) -> &InFlight {
        self.refresher.in_flight()
    }

    pub async fn tick(&self) -> TickReport {
        let sweep = self.refresher.run(&self.tokens).await;
        let push = broadcast_view::run(&self.state).await;

        TickReport { sweep, push }
    }
}

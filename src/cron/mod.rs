pub mod jobs;
mod scheduler;
mod sweeper;

pub use jobs::refresh_tokens::{InFlight, SweepReport, TokenError, TokenRefresher};
pub use scheduler::CronScheduler;
pub use sweeper::{Sweeper, TickReport};

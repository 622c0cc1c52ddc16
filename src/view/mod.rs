//! Filtering, sorting and the shared view settings.
//!
//! - [`engine`] - pure projection / sort over canonical records
//! - [`state`] - the process-wide window and sort key

pub mod engine;
pub mod state;

pub use crate::models::InvalidParameter;
pub use engine::{compute, project, sort, View};
pub use state::{ViewQuery, ViewRequest, ViewSettings, ViewState};

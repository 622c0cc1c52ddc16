use serde::Serialize;

use crate::models::{CanonicalRecord, SortKey, ViewRecord, Window};

use super::ViewSettings;

/// Projects every record onto `window`.
///
/// Identity and market-state fields are copied unchanged; only volume,
/// transaction count and price change depend on the window.
pub fn project(records: &[CanonicalRecord], window: Window) -> Vec<ViewRecord> {
    records.iter().map(|r| ViewRecord::project(r, window)).collect()
}

/// Returns the records ordered by `key`, descending.
///
/// The sort is stable: records with equal keys keep their input order.
pub fn sort(records: &[ViewRecord], key: SortKey) -> Vec<ViewRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.sort_value(key).total_cmp(&a.sort_value(key)));
    sorted
}

/// What a query or broadcast returns.
///
/// Without a window the raw canonical records are exposed; with one, the
/// projected (and possibly sorted) view records. Serializes as a bare array
/// either way.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum View {
    Raw(Vec<CanonicalRecord>),
    Projected(Vec<ViewRecord>),
}

impl View {
    pub fn len(&self) -> usize {
        match self {
            View::Raw(records) => records.len(),
            View::Projected(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Applies a consistent window / sort-key pair to the cache contents.
///
/// An unset window skips filtering and sorting entirely.
pub fn compute(records: Vec<CanonicalRecord>, settings: ViewSettings) -> View {
    let Some(window) = settings.window else {
        return View::Raw(records);
    };

    let projected = project(&records, window);
    match settings.sort_key {
        Some(key) => View::Projected(sort(&projected, key)),
        None => View::Projected(projected),
    }
}

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::RwLock;

use crate::models::{InvalidParameter, SortKey, Window};

/// Current window and sort key. `None` means unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewSettings {
    pub window: Option<Window>,
    pub sort_key: Option<SortKey>,
}

/// Raw query-string selectors, before validation.
///
/// Accepts the historical `filter` / `sortBY` names as well as
/// `window` / `sort_by`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewQuery {
    #[serde(default, alias = "window")]
    pub filter: Option<String>,
    #[serde(default, rename = "sortBY", alias = "sort_by")]
    pub sort_by: Option<String>,
}

/// A validated view request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewRequest {
    /// No window selector: unfiltered cache, window reset to unset.
    /// The sort key is left as it was.
    Unfiltered,
    /// Window plus optional sort key; a missing sort key resets it to unset.
    Windowed {
        window: Window,
        sort_key: Option<SortKey>,
    },
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl ViewQuery {
    /// Validates both selectors before anything is applied.
    ///
    /// A sort selector without a window selector is ignored.
    pub fn parse(&self) -> Result<ViewRequest, InvalidParameter> {
        let Some(window) = non_empty(&self.filter) else {
            return Ok(ViewRequest::Unfiltered);
        };

        let window = window.parse::<Window>()?;
        let sort_key = non_empty(&self.sort_by)
            .map(str::parse::<SortKey>)
            .transpose()?;

        Ok(ViewRequest::Windowed { window, sort_key })
    }
}

/// Process-wide view settings shared by every request and every broadcast.
///
/// There is exactly one instance: a filter chosen by any client changes
/// what all observers receive on the next broadcast. Writes replace the
/// whole pair in one critical section and readers copy it out, so a
/// broadcast never sees a half-updated window / sort-key combination.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    inner: Arc<RwLock<ViewSettings>>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent copy of the current settings.
    pub async fn snapshot(&self) -> ViewSettings {
        *self.inner.read().await
    }

    /// Applies a validated request and returns the settings the caller
    /// should render with.
    pub async fn apply(&self, request: ViewRequest) -> ViewSettings {
        let mut settings = self.inner.write().await;
        match request {
            ViewRequest::Unfiltered => settings.window = None,
            ViewRequest::Windowed { window, sort_key } => {
                settings.window = Some(window);
                settings.sort_key = sort_key;
            },
        }
        *settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(filter: Option<&str>, sort_by: Option<&str>) -> ViewQuery {
        ViewQuery {
            filter: filter.map(String::from),
            sort_by: sort_by.map(String::from),
        }
    }

    #[test]
    fn test_parse_requests() {
        assert_eq!(query(None, None).parse(), Ok(ViewRequest::Unfiltered));
        assert_eq!(query(Some(""), None).parse(), Ok(ViewRequest::Unfiltered));
        assert_eq!(
            query(None, Some("volume")).parse(),
            Ok(ViewRequest::Unfiltered)
        );
        assert_eq!(
            query(Some("6h"), None).parse(),
            Ok(ViewRequest::Windowed {
                window: Window::H6,
                sort_key: None
            })
        );
        assert_eq!(
            query(Some("1h"), Some("price_change")).parse(),
            Ok(ViewRequest::Windowed {
                window: Window::H1,
                sort_key: Some(SortKey::PriceChange)
            })
        );
    }

    #[test]
    fn test_parse_rejects_bad_selectors() {
        assert_eq!(
            query(Some("bogus"), None).parse(),
            Err(InvalidParameter::Window("bogus".to_string()))
        );
        assert_eq!(
            query(Some("1h"), Some("liquidity")).parse(),
            Err(InvalidParameter::SortKey("liquidity".to_string()))
        );
    }

    #[test]
    fn test_query_string_names() {
        let q: ViewQuery = serde_json::from_str(r#"{"filter":"24h","sortBY":"volume"}"#).unwrap();
        assert_eq!(q.filter.as_deref(), Some("24h"));
        assert_eq!(q.sort_by.as_deref(), Some("volume"));

        let q: ViewQuery =
            serde_json::from_str(r#"{"window":"1h","sort_by":"market_cap_usd"}"#).unwrap();
        assert_eq!(q.filter.as_deref(), Some("1h"));
        assert_eq!(q.sort_by.as_deref(), Some("market_cap_usd"));
    }

    #[tokio::test]
    async fn test_starts_unset() {
        assert_eq!(ViewState::new().snapshot().await, ViewSettings::default());
    }

    #[tokio::test]
    async fn test_apply_windowed_then_unfiltered() {
        let state = ViewState::new();

        let applied = state
            .apply(ViewRequest::Windowed {
                window: Window::H1,
                sort_key: Some(SortKey::Volume),
            })
            .await;
        assert_eq!(applied.window, Some(Window::H1));
        assert_eq!(state.snapshot().await, applied);

        let applied = state.apply(ViewRequest::Unfiltered).await;
        assert_eq!(applied.window, None);
        // Sort key survives an unfiltered request
        assert_eq!(applied.sort_key, Some(SortKey::Volume));

        let applied = state
            .apply(ViewRequest::Windowed {
                window: Window::H6,
                sort_key: None,
            })
            .await;
        assert_eq!(applied.sort_key, None);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let state = ViewState::new();
        let other = state.clone();

        state
            .apply(ViewRequest::Windowed {
                window: Window::H24,
                sort_key: None,
            })
            .await;

        assert_eq!(other.snapshot().await.window, Some(Window::H24));
    }
}

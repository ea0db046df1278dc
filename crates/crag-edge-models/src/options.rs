//! Entries of the per-page options menu.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Action run when an options entry is picked.
///
/// Only meaningful inside the UI, so it never crosses a serialization
/// boundary.
#[derive(Clone)]
pub struct OptionsCallback(Arc<dyn Fn() + Send + Sync>);

impl OptionsCallback {
    /// Wrap a closure.
    pub fn new(callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(callback))
    }

    /// Run the closure.
    pub fn invoke(&self) {
        (self.0)();
    }
}

impl fmt::Debug for OptionsCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OptionsCallback")
    }
}

/// One entry in an options menu.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsItem {
    /// Label shown to the user
    pub name: String,
    /// Icon identifier
    pub icon: String,
    /// Action run when the entry is picked. Never serialized.
    #[serde(skip)]
    pub callback: Option<OptionsCallback>,
}

impl OptionsItem {
    /// Create an entry without a callback.
    pub fn new(name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: icon.into(),
            callback: None,
        }
    }

    /// Attach the action run on selection.
    #[must_use]
    pub fn with_callback(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.callback = Some(OptionsCallback::new(callback));
        self
    }

    /// Run the callback, if any. Returns whether one was attached.
    pub fn select(&self) -> bool {
        match &self.callback {
            Some(callback) => {
                callback.invoke();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_select_runs_callback() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let item = OptionsItem::new("Share", "share").with_callback(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(item.select());
        assert!(item.select());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_select_without_callback() {
        let item = OptionsItem::new("Share", "share");
        assert!(!item.select());
    }

    #[test]
    fn test_callback_not_serialized() {
        let item = OptionsItem::new("Report", "flag").with_callback(|| {});
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Report", "icon": "flag"}));

        let back: OptionsItem = serde_json::from_value(json).unwrap();
        assert!(back.callback.is_none());
    }
}

//! The browser adapter port.
//!
//! The real driver (CDP, WebDriver, …) lives outside the guard; the
//! interpreter only ever sees this trait. Every operation returns an
//! [`Observation`], the sole channel through which untrusted page
//! content reaches the session.

use async_trait::async_trait;
use browser_guard_ref_store::PageElement;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the browser reported after an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Page URL after the action
    pub url: String,

    /// Page title
    pub title: String,

    /// Visible text, when the adapter captured it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_text: Option<String>,

    /// Elements visible on the page
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<PageElement>,

    /// Capture time
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    pub fn at(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            visible_text: None,
            elements: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.visible_text = Some(text.into());
        self
    }

    pub fn with_elements(mut self, elements: Vec<PageElement>) -> Self {
        self.elements = elements;
        self
    }
}

/// Failures reported by the browser adapter.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("no element matches selector '{0}'")]
    ElementNotFound(String),

    #[error("browser operation timed out after {0}ms")]
    Timeout(u64),

    #[error("browser error: {0}")]
    Other(String),
}

/// The driver surface the interpreter suspends on. Implementations are
/// expected to honor cancellation by aborting in-flight I/O when the
/// session is dropped.
#[async_trait]
pub trait BrowserAdapter: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<Observation, AdapterError>;

    async fn click(&self, selector: &str) -> Result<Observation, AdapterError>;

    async fn type_text(&self, selector: &str, text: &str) -> Result<Observation, AdapterError>;

    async fn scroll(&self, direction: &str, amount: Option<i64>)
        -> Result<Observation, AdapterError>;

    /// Extract data for the given selectors; the returned value is an
    /// object keyed by selector.
    async fn extract(
        &self,
        selectors: &[String],
    ) -> Result<(Observation, serde_json::Value), AdapterError>;

    async fn screenshot(&self) -> Result<(Observation, Vec<u8>), AdapterError>;

    async fn wait(&self, ms: u64) -> Result<Observation, AdapterError>;

    async fn get_state(&self) -> Result<Observation, AdapterError>;
}

//! Scripted browser adapter for tests and demos.
//!
//! Pages are queued up front; every navigation pops the next page, and
//! element-level actions replay the current one. Extraction matches the
//! requested selectors against the page's elements with the same
//! selector engine the interpreter uses for branch conditions.

use async_trait::async_trait;
use browser_guard_interpreter::{AdapterError, BrowserAdapter, Observation, Selector};
use browser_guard_ref_store::PageElement;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;

/// One scripted page state.
#[derive(Debug, Clone)]
pub struct MockPage {
    pub url: String,
    pub title: String,
    pub text: String,
    pub elements: Vec<PageElement>,
}

impl MockPage {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            text: String::new(),
            elements: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_element(mut self, element: PageElement) -> Self {
        self.elements.push(element);
        self
    }

    fn observation(&self) -> Observation {
        Observation::at(&self.url, &self.title)
            .with_text(&self.text)
            .with_elements(self.elements.clone())
    }
}

/// Scripted adapter. Navigations consume the queue; other actions
/// observe the current page.
#[derive(Debug, Default)]
pub struct MockBrowser {
    queue: Mutex<VecDeque<MockPage>>,
    current: Mutex<Option<MockPage>>,
    calls: Mutex<Vec<String>>,
}

impl MockBrowser {
    pub fn new(pages: Vec<MockPage>) -> Self {
        Self {
            queue: Mutex::new(pages.into()),
            current: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every adapter call made so far, for assertions.
    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    fn current_observation(&self) -> Result<Observation, AdapterError> {
        self.current
            .lock()
            .as_ref()
            .map(MockPage::observation)
            .ok_or_else(|| AdapterError::Other("no page loaded".to_string()))
    }
}

#[async_trait]
impl BrowserAdapter for MockBrowser {
    async fn navigate(&self, url: &str) -> Result<Observation, AdapterError> {
        self.record(format!("navigate {url}"));
        let page = self
            .queue
            .lock()
            .pop_front()
            .ok_or_else(|| AdapterError::Navigation(format!("no scripted page for {url}")))?;
        let observation = page.observation();
        *self.current.lock() = Some(page);
        Ok(observation)
    }

    async fn click(&self, selector: &str) -> Result<Observation, AdapterError> {
        self.record(format!("click {selector}"));
        self.current_observation()
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<Observation, AdapterError> {
        self.record(format!("type {selector} {text}"));
        self.current_observation()
    }

    async fn scroll(
        &self,
        direction: &str,
        _amount: Option<i64>,
    ) -> Result<Observation, AdapterError> {
        self.record(format!("scroll {direction}"));
        self.current_observation()
    }

    async fn extract(&self, selectors: &[String]) -> Result<(Observation, Value), AdapterError> {
        self.record(format!("extract {}", selectors.join(",")));
        let observation = self.current_observation()?;
        let mut data = serde_json::Map::new();
        for selector in selectors {
            let texts: Vec<String> = Selector::parse(selector)
                .map(|parsed| {
                    observation
                        .elements
                        .iter()
                        .filter(|e| parsed.matches(e))
                        .filter_map(|e| e.text.clone())
                        .collect()
                })
                .unwrap_or_default();
            data.insert(selector.clone(), json!(texts));
        }
        Ok((observation, Value::Object(data)))
    }

    async fn screenshot(&self) -> Result<(Observation, Vec<u8>), AdapterError> {
        self.record("screenshot".to_string());
        Ok((self.current_observation()?, Vec::new()))
    }

    async fn wait(&self, ms: u64) -> Result<Observation, AdapterError> {
        self.record(format!("wait {ms}"));
        self.current_observation()
    }

    async fn get_state(&self) -> Result<Observation, AdapterError> {
        self.record("get_state".to_string());
        self.current_observation()
    }
}

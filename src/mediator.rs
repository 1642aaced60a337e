//! Tool-call mediation for host agent runtimes.
//!
//! The host calls [`GuardMediator::before_tool_call`] for every tool
//! invocation; `web_fetch` and `browser` are intercepted, everything
//! else passes through. Blocked calls come back with a human-readable
//! reason; allowed fetches may come back transformed with credential
//! headers stripped.

use browser_guard_http_filter::{HttpRequest, RequestFilter, CREDENTIAL_HEADERS};
use browser_guard_policy::{ActionContext, PolicyEngine};
use browser_guard_types::BrowserAction;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::intent::{parse_intent, ParseOptions};

/// Enforcement mode. Parsed case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardMode {
    /// Refuse denied calls
    Block,

    /// Log denied calls and pass them through
    Warn,
}

impl GuardMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "block" => Some(GuardMode::Block),
            "warn" => Some(GuardMode::Warn),
            _ => None,
        }
    }
}

/// An intercepted tool call.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallRequest {
    pub tool: String,

    #[serde(default)]
    pub params: Value,

    #[serde(default)]
    pub context: MediationContext,
}

/// Host-provided context for mediation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediationContext {
    #[serde(default)]
    pub user_request: String,
}

/// Replacement tool call, when the guard rewrites one.
#[derive(Debug, Clone, Serialize)]
pub struct ToolTransform {
    pub tool: String,
    pub params: Value,
}

/// The mediator's verdict.
#[derive(Debug, Clone, Serialize)]
pub struct MediationOutcome {
    pub allow: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<ToolTransform>,
}

impl MediationOutcome {
    fn allow() -> Self {
        Self {
            allow: true,
            reason: None,
            transform: None,
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allow: false,
            reason: Some(format!("Browser Guard: {}", reason.into())),
            transform: None,
        }
    }
}

/// Per-installation mediator.
pub struct GuardMediator {
    mode: GuardMode,
    parse_options: ParseOptions,
}

impl GuardMediator {
    pub fn new(mode: GuardMode) -> Self {
        Self {
            mode,
            parse_options: ParseOptions::default(),
        }
    }

    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self
    }

    /// Mediate one tool call.
    pub fn before_tool_call(&self, request: &ToolCallRequest) -> MediationOutcome {
        let outcome = match request.tool.as_str() {
            "web_fetch" => self.mediate_fetch(request),
            "browser" => self.mediate_browser(request),
            other => {
                debug!(tool = other, "tool passes through unmediated");
                MediationOutcome::allow()
            }
        };

        if !outcome.allow && self.mode == GuardMode::Warn {
            warn!(
                tool = %request.tool,
                reason = outcome.reason.as_deref().unwrap_or("-"),
                "deny converted to pass (warn mode)"
            );
            return MediationOutcome {
                allow: true,
                reason: outcome.reason,
                transform: outcome.transform,
            };
        }
        outcome
    }

    fn mediate_fetch(&self, request: &ToolCallRequest) -> MediationOutcome {
        let http: HttpRequest = match serde_json::from_value(request.params.clone()) {
            Ok(http) => http,
            Err(e) => return MediationOutcome::deny(format!("malformed fetch request: {e}")),
        };

        let intent = match parse_intent(&request.context.user_request, &self.parse_options) {
            Ok(intent) => intent,
            Err(e) => return MediationOutcome::deny(e.to_string()),
        };

        let filter = RequestFilter::from_intent(&intent);
        let decision = filter.filter(&http, None);
        if !decision.allowed {
            return MediationOutcome::deny(
                decision
                    .reason
                    .unwrap_or_else(|| "request refused".to_string()),
            );
        }

        if decision.strip_cookies {
            let mut params = request.params.clone();
            strip_credential_headers(&mut params);
            return MediationOutcome {
                allow: true,
                reason: None,
                transform: Some(ToolTransform {
                    tool: request.tool.clone(),
                    params,
                }),
            };
        }
        MediationOutcome::allow()
    }

    fn mediate_browser(&self, request: &ToolCallRequest) -> MediationOutcome {
        let intent = match parse_intent(&request.context.user_request, &self.parse_options) {
            Ok(intent) => intent,
            Err(e) => return MediationOutcome::deny(e.to_string()),
        };

        let engine = PolicyEngine::for_intent(&intent);
        let screening = engine.allows_intent(&intent);
        if !screening.allowed {
            return MediationOutcome::deny(
                screening
                    .reason
                    .unwrap_or_else(|| "intent refused".to_string()),
            );
        }

        let Some(action_value) = request.params.get("action") else {
            return MediationOutcome::allow();
        };
        let action: BrowserAction = match serde_json::from_value(action_value.clone()) {
            Ok(action) => action,
            Err(e) => return MediationOutcome::deny(format!("malformed browser action: {e}")),
        };

        let ctx = request
            .params
            .get("currentUrl")
            .and_then(Value::as_str)
            .map(ActionContext::at_url)
            .unwrap_or_default();

        let decision = engine.allows(&action, &ctx);
        if !decision.allowed {
            return MediationOutcome::deny(
                decision
                    .reason
                    .unwrap_or_else(|| "action refused".to_string()),
            );
        }
        MediationOutcome::allow()
    }
}

/// Remove `Cookie` and `Authorization` headers from a fetch params
/// object, in both spellings.
fn strip_credential_headers(params: &mut Value) {
    let Some(headers) = params.get_mut("headers").and_then(Value::as_object_mut) else {
        return;
    };
    for name in CREDENTIAL_HEADERS {
        headers.remove(*name);
    }
}

//! Prompt construction for plan generation.

use browser_guard_types::Intent;

/// The fixed system prompt. It declares the single-shot principle, the
/// closed alphabets, and the security rules a generated plan must obey;
/// the planner still re-checks everything, so the prompt is guidance,
/// not enforcement.
pub const SYSTEM_PROMPT: &str = "\
You are a browsing-plan generator for a security-mediated agent.

You produce ONE complete conditional plan before any page is observed. \
You will never be consulted again during execution, so every branch the \
session could need must be enumerated now: success paths, 404s, login \
walls, captchas, cookie banners, rate limits, and empty results.

Actions are limited to: navigate, click, scroll, type, extract, \
screenshot, wait. Branch conditions are limited to: element_present, \
element_absent, url_match, content_match, default.

Security rules the plan must obey:
- Only visit domains the task explicitly allows.
- Never click payment or checkout controls.
- Never download executables.
- Never enter credentials on non-HTTPS pages.
- Every non-terminal node needs at least one outgoing edge, ending in a \
default branch; every path must reach a terminal node with a result of \
success, error, or abort.

Respond with a single JSON document: nodes, edges, entryPoint.";

/// Build the user prompt from a validated intent.
pub fn build_user_prompt(intent: &Intent) -> String {
    let domains: Vec<&str> = intent.allowed_domains.iter().map(String::as_str).collect();
    let actions: Vec<&str> = intent
        .allowed_actions
        .iter()
        .map(|a| a.as_str())
        .collect();
    format!(
        "Task type: {}\nGoal: {}\nAllowed domains: {}\nAllowed actions: {}\nMaximum navigation depth: {}\n\nGenerate the complete conditional plan.",
        intent.task_type,
        intent.goal,
        domains.join(", "),
        actions.join(", "),
        intent.max_depth,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{parse_intent, ParseOptions};

    #[test]
    fn test_user_prompt_carries_the_boundary() {
        let intent = parse_intent(
            "Search for RTX 5090 prices on newegg.com",
            &ParseOptions::default(),
        )
        .unwrap();
        let prompt = build_user_prompt(&intent);
        assert!(prompt.contains("Task type: search"));
        assert!(prompt.contains("newegg.com"));
        assert!(prompt.contains("navigate"));
    }
}

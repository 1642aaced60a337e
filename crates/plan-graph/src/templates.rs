//! Template plan generation.
//!
//! Templates are the always-available planning strategy and the fallback
//! when a model-generated plan keeps failing validation. Every template
//! pre-enumerates the common failure modes (captcha, missing page,
//! rate limiting, login wall, cookie banner, empty results) so the
//! interpreter never has to improvise when one of them shows up.

use browser_guard_types::{ActionType, BrowserAction, Intent, TaskType};
use tracing::debug;

use crate::model::{
    EdgeCondition, ExpectedOutcome, ExtractionTarget, PlanEdge, PlanGraph, PlanNode,
    TerminalResult, ConditionType,
};

const CAPTCHA_PATTERN: &str = r"(?i)captcha|are you a robot|human verification";
const MISSING_PATTERN: &str = r"(?i)404|page not found";
const RATE_LIMIT_PATTERN: &str = r"(?i)rate limit|too many requests|unusual traffic";
const LOGIN_WALL_PATTERN: &str = r"(?i)log in to continue|sign in to continue|access denied|403";
const NO_RESULTS_PATTERN: &str = r"(?i)no results|nothing found|0 results";
const LOGIN_FAILED_PATTERN: &str = r"(?i)invalid|incorrect password|try again";

/// Build the template plan for an intent. `extra_targets` are appended
/// to every extract step.
pub fn build_template_plan(intent: &Intent, extra_targets: &[ExtractionTarget]) -> PlanGraph {
    let domain = intent
        .allowed_domains
        .iter()
        .next()
        .cloned()
        .unwrap_or_default();

    let mut graph = match intent.task_type {
        TaskType::Search => search_template(&domain, &intent.goal),
        TaskType::Extract => extract_template(&domain),
        TaskType::Monitor => monitor_template(&domain),
        TaskType::Interact => interact_template(&domain),
        TaskType::Purchase => purchase_template(&domain, &intent.goal),
        TaskType::Login => login_template(&domain),
    };

    for node in &mut graph.nodes {
        if node.action.action == ActionType::Extract {
            node.extraction_targets.extend(extra_targets.iter().cloned());
        }
    }

    graph.finalize_for_intent(intent);
    debug!(
        task = %intent.task_type,
        nodes = graph.nodes.len(),
        "built template plan"
    );
    graph
}

fn edge(from: &str, to: &str, condition: EdgeCondition, priority: u32) -> PlanEdge {
    PlanEdge {
        from: from.to_string(),
        to: to.to_string(),
        condition,
        priority,
    }
}

/// Failure terminals return to the site root; navigation is the one
/// action every task alphabet contains.
fn failure_terminal(id: &str, domain: &str, result: TerminalResult) -> PlanNode {
    PlanNode::new(
        id,
        BrowserAction::navigate(
            format!("https://{domain}/"),
            "Return to the start page after failure",
        ),
    )
    .terminal(result)
}

/// Attach the shared obstruction branches to `from`, creating the
/// failure terminals they point at.
fn obstruction_branches(
    nodes: &mut Vec<PlanNode>,
    edges: &mut Vec<PlanEdge>,
    from: &str,
    domain: &str,
) {
    nodes.push(failure_terminal("captcha-wall", domain, TerminalResult::Abort));
    nodes.push(failure_terminal("page-missing", domain, TerminalResult::Error));
    nodes.push(failure_terminal("rate-limited", domain, TerminalResult::Error));
    nodes.push(failure_terminal("login-wall", domain, TerminalResult::Error));
    edges.push(edge(
        from,
        "captcha-wall",
        EdgeCondition::content_match(CAPTCHA_PATTERN, "a captcha challenge appears"),
        1,
    ));
    edges.push(edge(
        from,
        "page-missing",
        EdgeCondition::content_match(MISSING_PATTERN, "the page does not exist"),
        2,
    ));
    edges.push(edge(
        from,
        "rate-limited",
        EdgeCondition::content_match(RATE_LIMIT_PATTERN, "the site is rate limiting"),
        3,
    ));
    edges.push(edge(
        from,
        "login-wall",
        EdgeCondition::content_match(LOGIN_WALL_PATTERN, "the content requires an account"),
        4,
    ));
}

/// Cookie-banner dismissal detour, for task types that may click.
fn cookie_branch(
    nodes: &mut Vec<PlanNode>,
    edges: &mut Vec<PlanEdge>,
    from: &str,
    resume: &str,
) {
    nodes.push(PlanNode::new(
        "dismiss-cookies",
        BrowserAction::click("#cookie-accept", "Accept the cookie banner"),
    ));
    edges.push(edge(
        from,
        "dismiss-cookies",
        EdgeCondition::element_present("#cookie-accept", "a cookie banner blocks the page"),
        5,
    ));
    edges.push(edge(
        "dismiss-cookies",
        resume,
        EdgeCondition::fallback("continue after dismissing the banner"),
        100,
    ));
}

fn landed_outcome(domain: &str) -> ExpectedOutcome {
    ExpectedOutcome {
        kind: ConditionType::UrlMatch,
        value: Some(domain.replace('.', r"\.")),
        description: format!("landed on {domain}"),
        required: false,
    }
}

fn search_template(domain: &str, goal: &str) -> PlanGraph {
    let mut nodes = vec![
        PlanNode::new(
            "open-site",
            BrowserAction::navigate(format!("https://{domain}/"), format!("Open {domain}")),
        )
        .with_outcome(landed_outcome(domain)),
        PlanNode::new(
            "enter-query",
            BrowserAction::type_text("input[type=search]", goal, "Enter the search query"),
        ),
        PlanNode::new(
            "submit-query",
            BrowserAction::click("button[type=submit]", "Submit the search"),
        ),
        PlanNode::new(
            "collect-results",
            BrowserAction::extract(".search-results", "Collect the result listing"),
        )
        .with_target(ExtractionTarget {
            name: "results".to_string(),
            selector: ".search-results".to_string(),
        })
        .terminal(TerminalResult::Success),
        failure_terminal("no-results", domain, TerminalResult::Error),
    ];
    let mut edges = vec![
        edge(
            "open-site",
            "enter-query",
            EdgeCondition::fallback("the page loaded normally"),
            100,
        ),
        edge(
            "enter-query",
            "submit-query",
            EdgeCondition::fallback("the query was typed"),
            100,
        ),
        edge(
            "submit-query",
            "no-results",
            EdgeCondition::content_match(NO_RESULTS_PATTERN, "the search returned nothing"),
            10,
        ),
        edge(
            "submit-query",
            "collect-results",
            EdgeCondition::fallback("results are shown"),
            100,
        ),
    ];
    obstruction_branches(&mut nodes, &mut edges, "open-site", domain);
    cookie_branch(&mut nodes, &mut edges, "open-site", "enter-query");
    PlanGraph::new(nodes, edges, "open-site")
}

fn extract_template(domain: &str) -> PlanGraph {
    let mut nodes = vec![
        PlanNode::new(
            "open-page",
            BrowserAction::navigate(format!("https://{domain}/"), format!("Open {domain}")),
        )
        .with_outcome(landed_outcome(domain)),
        PlanNode::new(
            "scroll-page",
            BrowserAction::bare(ActionType::Scroll, "Scroll to load the full content")
                .with_value("down"),
        ),
        PlanNode::new(
            "harvest",
            BrowserAction::extract("main", "Extract the page content"),
        )
        .with_target(ExtractionTarget {
            name: "content".to_string(),
            selector: "main".to_string(),
        })
        .terminal(TerminalResult::Success),
    ];
    let mut edges = vec![
        edge(
            "open-page",
            "scroll-page",
            EdgeCondition::fallback("the page loaded normally"),
            100,
        ),
        edge(
            "scroll-page",
            "harvest",
            EdgeCondition::fallback("content is in view"),
            100,
        ),
    ];
    obstruction_branches(&mut nodes, &mut edges, "open-page", domain);
    PlanGraph::new(nodes, edges, "open-page")
}

fn monitor_template(domain: &str) -> PlanGraph {
    let mut nodes = vec![
        PlanNode::new(
            "open-page",
            BrowserAction::navigate(format!("https://{domain}/"), format!("Open {domain}")),
        ),
        PlanNode::new(
            "settle",
            BrowserAction::bare(ActionType::Wait, "Wait for dynamic content").with_value("2000"),
        ),
        PlanNode::new(
            "observe",
            BrowserAction::extract("main", "Record the observed state"),
        )
        .with_target(ExtractionTarget {
            name: "observation".to_string(),
            selector: "main".to_string(),
        })
        .terminal(TerminalResult::Success),
    ];
    let mut edges = vec![
        edge(
            "open-page",
            "settle",
            EdgeCondition::fallback("the page loaded normally"),
            100,
        ),
        edge(
            "settle",
            "observe",
            EdgeCondition::fallback("the page has settled"),
            100,
        ),
    ];
    obstruction_branches(&mut nodes, &mut edges, "open-page", domain);
    PlanGraph::new(nodes, edges, "open-page")
}

fn interact_template(domain: &str) -> PlanGraph {
    let mut nodes = vec![
        PlanNode::new(
            "open-page",
            BrowserAction::navigate(format!("https://{domain}/"), format!("Open {domain}")),
        ),
        PlanNode::new(
            "engage",
            BrowserAction::click(".primary-action", "Activate the primary control"),
        ),
        PlanNode::new(
            "harvest",
            BrowserAction::extract("main", "Extract the resulting state"),
        )
        .terminal(TerminalResult::Success),
    ];
    let mut edges = vec![
        edge(
            "open-page",
            "engage",
            EdgeCondition::fallback("the page loaded normally"),
            100,
        ),
        edge(
            "engage",
            "harvest",
            EdgeCondition::fallback("the interaction completed"),
            100,
        ),
    ];
    obstruction_branches(&mut nodes, &mut edges, "open-page", domain);
    cookie_branch(&mut nodes, &mut edges, "open-page", "engage");
    PlanGraph::new(nodes, edges, "open-page")
}

fn purchase_template(domain: &str, goal: &str) -> PlanGraph {
    let mut nodes = vec![
        PlanNode::new(
            "open-store",
            BrowserAction::navigate(format!("https://{domain}/"), format!("Open {domain}")),
        ),
        PlanNode::new(
            "find-item",
            BrowserAction::type_text("input[type=search]", goal, "Search for the item"),
        ),
        PlanNode::new(
            "submit-search",
            BrowserAction::click("button[type=submit]", "Submit the item search"),
        ),
        PlanNode::new(
            "open-product",
            BrowserAction::click(".product-link", "Open the first matching product"),
        ),
        PlanNode::new(
            "add-to-cart",
            BrowserAction::click("#add-to-cart", "Add the item to the cart"),
        )
        .with_outcome(ExpectedOutcome {
            kind: ConditionType::ElementPresent,
            value: Some(".cart-count".to_string()),
            description: "the cart badge updated".to_string(),
            required: false,
        }),
        PlanNode::new(
            "view-cart",
            BrowserAction::navigate(format!("https://{domain}/cart"), "Open the cart"),
        ),
        // The plan ends at the cart review; payment is never scripted.
        PlanNode::new(
            "review-cart",
            BrowserAction::extract(".cart-summary", "Record the cart summary for the user"),
        )
        .with_target(ExtractionTarget {
            name: "cart".to_string(),
            selector: ".cart-summary".to_string(),
        })
        .terminal(TerminalResult::Success),
        failure_terminal("no-results", domain, TerminalResult::Error),
    ];
    let mut edges = vec![
        edge(
            "open-store",
            "find-item",
            EdgeCondition::fallback("the storefront loaded"),
            100,
        ),
        edge(
            "find-item",
            "submit-search",
            EdgeCondition::fallback("the query was typed"),
            100,
        ),
        edge(
            "submit-search",
            "no-results",
            EdgeCondition::content_match(NO_RESULTS_PATTERN, "no matching items"),
            10,
        ),
        edge(
            "submit-search",
            "open-product",
            EdgeCondition::element_present(".product-link", "matching items are listed"),
            50,
        ),
        edge(
            "submit-search",
            "no-results",
            EdgeCondition::fallback("nothing matched"),
            100,
        ),
        edge(
            "open-product",
            "add-to-cart",
            EdgeCondition::fallback("the product page opened"),
            100,
        ),
        edge(
            "add-to-cart",
            "view-cart",
            EdgeCondition::fallback("the item is in the cart"),
            100,
        ),
        edge(
            "view-cart",
            "review-cart",
            EdgeCondition::fallback("the cart page opened"),
            100,
        ),
    ];
    obstruction_branches(&mut nodes, &mut edges, "open-store", domain);
    cookie_branch(&mut nodes, &mut edges, "open-store", "find-item");
    PlanGraph::new(nodes, edges, "open-store")
}

fn login_template(domain: &str) -> PlanGraph {
    let mut nodes = vec![
        PlanNode::new(
            "open-login",
            BrowserAction::navigate(
                format!("https://{domain}/login"),
                format!("Open the {domain} sign-in page"),
            ),
        ),
        // Credential values are never embedded in a plan; the host fills
        // them at execution time.
        PlanNode::new(
            "enter-username",
            BrowserAction::new(
                ActionType::Type,
                "input[name=username]",
                "Enter the account username",
            ),
        ),
        PlanNode::new(
            "enter-password",
            BrowserAction::new(
                ActionType::Type,
                "input[type=password]",
                "Enter the account password",
            ),
        ),
        PlanNode::new(
            "submit-login",
            BrowserAction::click("button[type=submit]", "Submit the sign-in form"),
        ),
        PlanNode::new(
            "logged-in",
            BrowserAction::navigate(
                format!("https://{domain}/"),
                "Confirm the signed-in landing page",
            ),
        )
        .with_outcome(ExpectedOutcome {
            kind: ConditionType::ContentMatch,
            value: Some(r"(?i)sign out|log out|account".to_string()),
            description: "the session is signed in".to_string(),
            required: false,
        })
        .terminal(TerminalResult::Success),
        failure_terminal("login-failed", domain, TerminalResult::Error),
    ];
    let mut edges = vec![
        edge(
            "open-login",
            "enter-username",
            EdgeCondition::fallback("the sign-in form is shown"),
            100,
        ),
        edge(
            "enter-username",
            "enter-password",
            EdgeCondition::fallback("the username was typed"),
            100,
        ),
        edge(
            "enter-password",
            "submit-login",
            EdgeCondition::fallback("the password was typed"),
            100,
        ),
        edge(
            "submit-login",
            "login-failed",
            EdgeCondition::content_match(LOGIN_FAILED_PATTERN, "the credentials were rejected"),
            10,
        ),
        edge(
            "submit-login",
            "logged-in",
            EdgeCondition::fallback("the sign-in succeeded"),
            100,
        ),
    ];
    obstruction_branches(&mut nodes, &mut edges, "open-login", domain);
    PlanGraph::new(nodes, edges, "open-login")
}

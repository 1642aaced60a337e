//! HTTP request filter for Browser Guard.
//!
//! Independent second line of defense against exfiltration: every
//! outbound request from the fetch side of the tool surface is mapped
//! through site policies and sitemaps to a semantic action, and rules
//! fire on those semantic actions rather than raw URLs. A predicted
//! allowlist derived from the session intent fences everything else.

pub mod errors;
pub mod filter;
pub mod model;
pub mod pattern;

pub use errors::FilterError;
pub use filter::RequestFilter;
pub use model::{
    AllowedRequest, FilterDecision, FilterEffect, HttpRequest, SitePolicy, SiteRule, SitemapEntry,
};
pub use pattern::url_pattern_to_regex;

/// Header names stripped when a decision says credentials must not leave.
pub const CREDENTIAL_HEADERS: &[&str] = &["Cookie", "cookie", "Authorization", "authorization"];

//! Hostname normalization and subdomain matching.
//!
//! Matching semantics are shared by the policy engine, the HTTP filter,
//! and the interpreter's steering detector: a host matches an allowed
//! domain when it is equal to it or a subdomain of it.

use url::Url;

/// Lowercase a host and strip any trailing dot.
pub fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Exact-or-subdomain match of `host` against `allowed`.
///
/// `api.github.com` matches `github.com`; `github.com.attacker.com`
/// does not match `github.com` because the comparison anchors on the
/// registrable suffix, not a substring.
pub fn domain_matches(host: &str, allowed: &str) -> bool {
    let host = normalize_host(host);
    let allowed = normalize_host(allowed);
    if host.is_empty() || allowed.is_empty() {
        return false;
    }
    host == allowed || host.ends_with(&format!(".{allowed}"))
}

/// True when `host` matches any entry of `allowed`.
pub fn any_domain_matches<'a, I>(host: &str, allowed: I) -> bool
where
    I: IntoIterator<Item = &'a String>,
{
    allowed.into_iter().any(|d| domain_matches(host, d))
}

/// Extract the normalized host of a URL string, if it has one.
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(normalize_host)
}

/// Statically-known CDN/API companions for anchor hosts. Sessions that
/// may contact the anchor almost always need these too (the anchor's
/// pages load from them), so intent expansion and allowlist prediction
/// share this table.
pub fn companion_hosts(host: &str) -> &'static [&'static str] {
    match normalize_host(host).trim_start_matches("www.") {
        "github.com" => &[
            "api.github.com",
            "raw.githubusercontent.com",
            "avatars.githubusercontent.com",
            "github.githubassets.com",
        ],
        "gitlab.com" => &["assets.gitlab-static.net"],
        "stackoverflow.com" => &["cdn.sstatic.net"],
        "wikipedia.org" => &["upload.wikimedia.org"],
        "reddit.com" => &["redd.it", "redditstatic.com"],
        _ => &[],
    }
}

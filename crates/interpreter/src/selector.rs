//! Small selector engine.
//!
//! Covers the subset plans actually use: tag names, `.class`, `#id`,
//! and `[attr]` predicates with the `=`, `*=`, `^=`, `$=` operators,
//! in any compound combination (`input[type=search]`,
//! `button.primary#send`). Anything richer is not a plan-expressible
//! selector and fails to parse.

use browser_guard_ref_store::PageElement;

/// Attribute comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    /// Attribute exists
    Exists,
    /// Exact value
    Equals,
    /// Substring
    Contains,
    /// Prefix
    StartsWith,
    /// Suffix
    EndsWith,
}

/// One `[attr op value]` predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrPredicate {
    pub name: String,
    pub op: AttrOp,
    pub value: Option<String>,
}

impl AttrPredicate {
    fn holds(&self, element: &PageElement) -> bool {
        let Some(actual) = element.attr(&self.name) else {
            return false;
        };
        match (self.op, self.value.as_deref()) {
            (AttrOp::Exists, _) => true,
            (AttrOp::Equals, Some(expected)) => actual == expected,
            (AttrOp::Contains, Some(expected)) => actual.contains(expected),
            (AttrOp::StartsWith, Some(expected)) => actual.starts_with(expected),
            (AttrOp::EndsWith, Some(expected)) => actual.ends_with(expected),
            _ => false,
        }
    }
}

/// A parsed compound selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrPredicate>,
}

impl Selector {
    /// Parse a selector string; `None` for anything outside the
    /// supported subset.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        let mut selector = Selector::default();
        let chars: Vec<char> = input.chars().collect();
        let mut pos = 0;

        if chars[0].is_ascii_alphabetic() || chars[0] == '*' {
            let start = pos;
            while pos < chars.len()
                && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '-' || chars[pos] == '*')
            {
                pos += 1;
            }
            let tag: String = chars[start..pos].iter().collect();
            if tag != "*" {
                selector.tag = Some(tag.to_ascii_lowercase());
            }
        }

        while pos < chars.len() {
            match chars[pos] {
                '.' => {
                    pos += 1;
                    let name = take_name(&chars, &mut pos)?;
                    selector.classes.push(name);
                }
                '#' => {
                    pos += 1;
                    let name = take_name(&chars, &mut pos)?;
                    selector.id = Some(name);
                }
                '[' => {
                    pos += 1;
                    let close = chars[pos..].iter().position(|&c| c == ']')? + pos;
                    let body: String = chars[pos..close].iter().collect();
                    selector.attrs.push(parse_attr(&body)?);
                    pos = close + 1;
                }
                _ => return None,
            }
        }

        if selector.tag.is_none()
            && selector.id.is_none()
            && selector.classes.is_empty()
            && selector.attrs.is_empty()
        {
            return None;
        }
        Some(selector)
    }

    /// Whether `element` satisfies every component of the selector.
    pub fn matches(&self, element: &PageElement) -> bool {
        if let Some(tag) = &self.tag {
            if !element.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let element_classes = element.classes();
            if !self
                .classes
                .iter()
                .all(|c| element_classes.contains(&c.as_str()))
            {
                return false;
            }
        }
        self.attrs.iter().all(|attr| attr.holds(element))
    }
}

fn take_name(chars: &[char], pos: &mut usize) -> Option<String> {
    let start = *pos;
    while *pos < chars.len()
        && (chars[*pos].is_ascii_alphanumeric() || chars[*pos] == '-' || chars[*pos] == '_')
    {
        *pos += 1;
    }
    if *pos == start {
        return None;
    }
    Some(chars[start..*pos].iter().collect())
}

fn parse_attr(body: &str) -> Option<AttrPredicate> {
    let body = body.trim();
    for (symbol, op) in [
        ("*=", AttrOp::Contains),
        ("^=", AttrOp::StartsWith),
        ("$=", AttrOp::EndsWith),
        ("=", AttrOp::Equals),
    ] {
        if let Some((name, value)) = body.split_once(symbol) {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            return Some(AttrPredicate {
                name: name.trim().to_string(),
                op,
                value: Some(value.to_string()),
            });
        }
    }
    if body.is_empty() {
        return None;
    }
    Some(AttrPredicate {
        name: body.to_string(),
        op: AttrOp::Exists,
        value: None,
    })
}

/// Whether any element matches the selector string.
pub fn any_match(selector: &str, elements: &[PageElement]) -> bool {
    Selector::parse(selector)
        .map(|s| elements.iter().any(|e| s.matches(e)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_input() -> PageElement {
        PageElement::new("input")
            .with_attr("type", "search")
            .with_attr("id", "q")
            .with_attr("class", "field field-search")
    }

    #[test]
    fn test_tag_selector() {
        let selector = Selector::parse("input").unwrap();
        assert!(selector.matches(&search_input()));
        assert!(!selector.matches(&PageElement::new("button")));
    }

    #[test]
    fn test_id_selector() {
        assert!(Selector::parse("#q").unwrap().matches(&search_input()));
        assert!(!Selector::parse("#other").unwrap().matches(&search_input()));
    }

    #[test]
    fn test_class_selector() {
        assert!(Selector::parse(".field-search")
            .unwrap()
            .matches(&search_input()));
        assert!(Selector::parse(".field.field-search")
            .unwrap()
            .matches(&search_input()));
        assert!(!Selector::parse(".missing").unwrap().matches(&search_input()));
    }

    #[test]
    fn test_compound_tag_attr() {
        let selector = Selector::parse("input[type=search]").unwrap();
        assert!(selector.matches(&search_input()));
        let other = PageElement::new("input").with_attr("type", "text");
        assert!(!selector.matches(&other));
    }

    #[test]
    fn test_attr_operators() {
        let element = PageElement::new("a").with_attr("href", "https://a.example/download.pdf");
        assert!(Selector::parse("a[href^=https]").unwrap().matches(&element));
        assert!(Selector::parse("a[href$=.pdf]").unwrap().matches(&element));
        assert!(Selector::parse("a[href*=example]").unwrap().matches(&element));
        assert!(Selector::parse("a[href]").unwrap().matches(&element));
        assert!(!Selector::parse("a[href^=ftp]").unwrap().matches(&element));
    }

    #[test]
    fn test_quoted_attr_value() {
        let element = PageElement::new("button").with_attr("name", "add to cart");
        assert!(Selector::parse(r#"button[name="add to cart"]"#)
            .unwrap()
            .matches(&element));
    }

    #[test]
    fn test_unsupported_selectors_fail_to_parse() {
        assert!(Selector::parse("div > span").is_none());
        assert!(Selector::parse("a:hover").is_none());
        assert!(Selector::parse("").is_none());
    }

    #[test]
    fn test_any_match() {
        let elements = vec![search_input(), PageElement::new("button")];
        assert!(any_match("input[type=search]", &elements));
        assert!(!any_match(".cookie-banner", &elements));
    }
}

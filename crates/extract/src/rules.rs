//! Ordered extraction rules.
//!
//! A field is located by trying its rules in order; the first rule that
//! produces a value wins. The order is part of the contract: tighter,
//! markup-specific patterns come first and looser fallbacks last.

use regex::Regex;

/// One named way of locating a value in a document.
pub struct Rule<T> {
    pub name: &'static str,
    pub apply: fn(&str) -> Option<T>,
}

impl<T> Rule<T> {
    pub const fn new(name: &'static str, apply: fn(&str) -> Option<T>) -> Self {
        Self { name, apply }
    }
}

/// A value together with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched<T> {
    pub value: T,
    pub rule: &'static str,
}

/// Try `rules` in order and return the first hit.
pub fn first_match<T>(rules: &[Rule<T>], html: &str) -> Option<Matched<T>> {
    rules.iter().find_map(|rule| {
        (rule.apply)(html).map(|value| Matched {
            value,
            rule: rule.name,
        })
    })
}

/// Compile a pattern written in this crate.
///
/// Only called with string literals that are covered by unit tests.
#[allow(clippy::expect_used)]
pub(crate) fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("literal pattern compiles")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn never(_: &str) -> Option<u32> {
        None
    }

    fn length(html: &str) -> Option<u32> {
        Some(html.len() as u32)
    }

    fn always_one(_: &str) -> Option<u32> {
        Some(1)
    }

    #[test]
    fn first_hit_wins_in_order() {
        let rules = [
            Rule::new("never", never),
            Rule::new("length", length),
            Rule::new("one", always_one),
        ];
        let hit = first_match(&rules, "abcd").unwrap();
        assert_eq!(hit.value, 4);
        assert_eq!(hit.rule, "length");
    }

    #[test]
    fn no_rule_matches() {
        let rules = [Rule::new("never", never)];
        assert!(first_match(&rules, "abcd").is_none());
        assert!(first_match::<u32>(&[], "abcd").is_none());
    }
}

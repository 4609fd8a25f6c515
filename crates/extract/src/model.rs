//! Structured tweet record produced by the extraction engine.

use std::fmt;

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// A single post, as extracted from its rendered page.
///
/// `partial` is set when one or more non-essential fields could not be
/// located. A partial record is still valid and is returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    /// Origin URL, built from the addressing username.
    pub url: String,
    /// Username taken from the caller's URL (used for addressing and caching).
    pub username: String,
    pub author: Author,
    pub content: Content,
    pub partial: bool,
}

impl Tweet {
    /// Build a record for `id` with the addressing fields left empty.
    pub fn new(id: impl Into<String>, author: Author, content: Content, partial: bool) -> Self {
        Self {
            id: id.into(),
            url: String::new(),
            username: String::new(),
            author,
            content,
            partial,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub handle: String,
    pub avatar_url: String,
    pub verification: Verification,
}

impl Author {
    pub fn is_verified(&self) -> bool {
        self.verification != Verification::Unverified
    }
}

/// Verification badge tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    #[default]
    Unverified,
    /// Blue badge.
    Standard,
    /// Gold badge.
    Organization,
    /// Gray badge.
    Government,
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unverified => "unverified",
            Self::Standard => "standard",
            Self::Organization => "organization",
            Self::Government => "government",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

impl fmt::Display for TextDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ltr => f.write_str("ltr"),
            Self::Rtl => f.write_str("rtl"),
        }
    }
}

/// Body of a post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Main text. Newlines are preserved and links are expanded to full URLs.
    pub text: String,
    pub direction: TextDirection,
    /// Creation time; the Unix epoch when the page carried no usable timestamp.
    pub created_at: DateTime<Utc>,
    /// Quoted post, one level deep only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted: Option<QuotedTweet>,
}

impl Content {
    /// Whether a timestamp was found on the page.
    pub fn has_timestamp(&self) -> bool {
        self.created_at != DateTime::<Utc>::default()
    }
}

/// A quoted post. Quotes inside a quote are never extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotedTweet {
    /// Display text of the quoted author's name block (may be empty).
    pub author: String,
    pub text: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_content_has_zero_timestamp() {
        let content = Content::default();
        assert!(!content.has_timestamp());
        assert_eq!(content.direction, TextDirection::Ltr);
        assert!(content.quoted.is_none());
    }

    #[test]
    fn unverified_author_is_not_verified() {
        let mut author = Author::default();
        assert!(!author.is_verified());
        author.verification = Verification::Government;
        assert!(author.is_verified());
    }

    #[test]
    fn serializes_enums_in_lowercase() {
        let content = Content {
            text: "hi".into(),
            direction: TextDirection::Rtl,
            ..Default::default()
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["direction"], "rtl");
        assert!(json.get("quoted").is_none());

        let json = serde_json::to_value(Verification::Organization).unwrap();
        assert_eq!(json, "organization");
    }
}

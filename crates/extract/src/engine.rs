use std::fmt;

use {serde::Serialize, thiserror::Error};

use crate::{
    fields::{self, QuoteLookup},
    model::{Author, Content, Tweet},
};

/// Non-essential fields that may be absent from a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Handle,
    Avatar,
    QuotedText,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Name => "name",
            Self::Handle => "handle",
            Self::Avatar => "avatar",
            Self::QuotedText => "quoted_text",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The main text is missing or empty after normalization.
    #[error("essential tweet text not found")]
    EssentialTextNotFound,
}

/// Result of running every extractor over one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub author: Author,
    pub content: Content,
    pub partial: bool,
    pub missing: Vec<Field>,
}

impl Extraction {
    /// Attach an id and turn the extraction into a [`Tweet`].
    pub fn into_tweet(self, id: impl Into<String>) -> Tweet {
        Tweet::new(id, self.author, self.content, self.partial)
    }
}

/// Extract a structured record from a fully rendered page.
///
/// Only the main text is essential. Every other field degrades to its
/// default and is listed in [`Extraction::missing`].
pub fn extract(html: &str) -> Result<Extraction, ExtractError> {
    let main = fields::main_region(html);
    let mut missing = Vec::new();

    let found = fields::extract_name_and_handle(main);
    let name = found.name.unwrap_or_else(|| {
        missing.push(Field::Name);
        String::new()
    });
    let handle = found
        .handle
        .or_else(|| fields::extract_handle_fallback(main))
        .unwrap_or_else(|| {
            missing.push(Field::Handle);
            String::new()
        });
    let avatar_url = fields::extract_avatar(main).unwrap_or_else(|| {
        missing.push(Field::Avatar);
        String::new()
    });
    let verification = fields::extract_verification(main);

    let container = fields::locate_text_container(main);
    let text = container
        .as_ref()
        .map(|c| fields::render_text(&c.inner))
        .unwrap_or_default();
    if text.is_empty() {
        tracing::debug!("no main text in document");
        return Err(ExtractError::EssentialTextNotFound);
    }

    let direction =
        fields::extract_direction(container.as_ref().map(|c| c.attributes.as_str()), main);

    // The main post's time element may follow the quote card; the card's
    // own time element belongs to the quoted post.
    let created_at = fields::extract_timestamp(main)
        .or_else(|| fields::after_quote(html).and_then(fields::extract_timestamp))
        .unwrap_or_default();

    let quoted = match fields::extract_quote(html) {
        QuoteLookup::Absent => None,
        QuoteLookup::Found(quote) => Some(quote),
        QuoteLookup::Unreadable => {
            missing.push(Field::QuotedText);
            None
        },
    };

    if !missing.is_empty() {
        tracing::debug!(?missing, "partial extraction");
    }

    Ok(Extraction {
        author: Author {
            name,
            handle,
            avatar_url,
            verification,
        },
        content: Content {
            text,
            direction,
            created_at,
            quoted,
        },
        partial: !missing.is_empty(),
        missing,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn minimal_document() {
        let out = extract(r#"<div data-testid="tweetText" dir="ltr">Hello World</div>"#).unwrap();
        assert_eq!(out.content.text, "Hello World");
        assert!(out.partial);
        assert_eq!(out.missing, vec![Field::Name, Field::Handle, Field::Avatar]);
    }

    #[test]
    fn whitespace_only_text_is_an_error() {
        let err = extract(r#"<div data-testid="tweetText">  <span> </span> </div>"#).unwrap_err();
        assert_eq!(err, ExtractError::EssentialTextNotFound);
    }

    #[test]
    fn quoted_author_never_replaces_main_author() {
        let html = r#"
            <div data-testid="tweetText">main</div>
            <div data-testid="quoteTweet">
                <div data-testid="User-Name"><span>Quoted</span><span>@quoted</span></div>
                <div data-testid="tweetText">quoted text</div>
            </div>"#;
        let out = extract(html).unwrap();
        assert!(out.author.name.is_empty());
        assert!(out.author.handle.is_empty());
        assert_eq!(out.content.quoted.unwrap().text, "quoted text");
    }

    #[test]
    fn field_labels() {
        assert_eq!(Field::QuotedText.to_string(), "quoted_text");
        assert_eq!(serde_json::to_value(Field::Avatar).unwrap(), "avatar");
    }
}

//! Field extractors.
//!
//! Each extractor locates one semantic field inside a full rendered
//! document. They work on raw markup with ordered pattern rules (see
//! [`crate::rules`]) rather than a DOM, so every one of them tolerates
//! missing or reshaped markup by returning `None` or a default.

use std::{ops::Range, sync::LazyLock};

use {
    chrono::{DateTime, Utc},
    regex::Regex,
};

use crate::{
    model::{QuotedTweet, TextDirection, Verification},
    normalize::{fragment_to_line, fragment_to_text},
    rules::{Matched, Rule, compile, first_match},
};

/// Marks the container of a quoted post.
pub const QUOTE_MARKER: &str = r#"data-testid="quoteTweet""#;
/// Marks the verification badge element.
pub const VERIFIED_MARKER: &str = r#"data-testid="icon-verified""#;
/// Marks a post's article; a second one starts the next post on the page.
pub const ARTICLE_MARKER: &str = r#"data-testid="tweet""#;

const ARTICLE_CLOSE: &str = "</article>";
/// The only component marker allowed inside a name block.
const VERIFIED_TEST_ID: &str = "icon-verified";

const SVG_CLOSE: &str = "</svg>";
/// Upper bound on how far past the badge marker tier hints are searched.
const BADGE_REGION_LIMIT: usize = 4096;

static NAME_BLOCK_NESTED: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"data-testid="User-Name"[^>]*>([\s\S]*?)</div>\s*</div>\s*</div>"#)
});
static NAME_BLOCK_FLAT: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"data-testid="User-Name"[^>]*>([\s\S]*?)</div>"#));
static HANDLE_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| compile(r"@([A-Za-z0-9_]{1,15})"));
static HANDLE_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| compile(r">\s*@([A-Za-z0-9_]{1,15})\s*<"));
static TEST_ID: LazyLock<Regex> = LazyLock::new(|| compile(r#"data-testid="([^"]*)""#));
static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| compile(r"<(/?)([A-Za-z][A-Za-z0-9]*)\b[^>]*>"));
static PROFILE_STATUS_LINK: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"href="/([A-Za-z0-9_]{1,15})/status/"#));
static AVATAR_CONTAINER_IMG: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"data-testid="Tweet-User-Avatar"[^>]*>.*?<img\b[^>]*?\bsrc="([^"]+)""#)
});
static AVATAR_MARKER_SRC: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"data-testid="Tweet-User-Avatar"[^>]*?\bsrc="([^"]+)""#));
static PROFILE_IMAGE_URL: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"src="(https://pbs\.twimg\.com/profile_images/[^"]+)""#));
static TEXT_CONTAINER_CLOSED: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"<[A-Za-z][A-Za-z0-9]*\b([^>]*?\bdata-testid="tweetText"[^>]*)>([\s\S]*?)</div>"#)
});
static TEXT_CONTAINER_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"<[A-Za-z][A-Za-z0-9]*\b([^>]*?\bdata-testid="tweetText"[^>]*)>([\s\S]*?)<div"#)
});
static DIR_ATTR: LazyLock<Regex> = LazyLock::new(|| compile(r#"\bdir="([^"]*)""#));
static TIME_DATETIME: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"<time\b[^>]*?\bdatetime="([^"]+)""#));
static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"(?i)<a\b[^>]*?\bhref="([^"]+)"[^>]*>([\s\S]*?)</a>"#));

/// Link targets that stay on the site and keep their visible label.
const INTERNAL_LINK_PATTERNS: &[&str] = &[
    "twitter.com/hashtag",
    "twitter.com/search",
    "x.com/hashtag",
    "x.com/search",
];

fn group(re: &Regex, html: &str, index: usize) -> Option<String> {
    re.captures(html)
        .and_then(|c| c.get(index))
        .map(|m| m.as_str().to_owned())
}

// ── Author name and handle ──────────────────────────────────────────────────

const NAME_BLOCK_RULES: &[Rule<String>] = &[
    Rule::new("user-name-nested", |html| {
        group(&NAME_BLOCK_NESTED, html, 1).map(within_name_block)
    }),
    Rule::new("user-name-flat", |html| {
        group(&NAME_BLOCK_FLAT, html, 1).map(within_name_block)
    }),
];

const HANDLE_FALLBACK_RULES: &[Rule<String>] =
    &[Rule::new("profile-status-link", handle_from_profile_link)];

/// Display name and handle as found in the author's name block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameAndHandle {
    pub name: Option<String>,
    pub handle: Option<String>,
}

/// Cut a matched name block at the first marker of another component, so
/// a lazy match that overshoots the block never reaches the avatar or text.
fn within_name_block(mut block: String) -> String {
    let end = TEST_ID
        .captures_iter(&block)
        .find(|c| c.get(1).is_some_and(|id| id.as_str() != VERIFIED_TEST_ID))
        .and_then(|c| c.get(0))
        .map(|m| block[..m.start()].rfind('<').unwrap_or(m.start()));
    if let Some(end) = end {
        block.truncate(end);
    }
    block
}

/// Locate the name block and split it into display name and handle.
///
/// The block reads like `Display Name @handle · 2h`. The handle is the
/// first element whose whole text is `@handle`, so display names that
/// contain `@` survive.
pub fn extract_name_and_handle(html: &str) -> NameAndHandle {
    let Some(Matched { value: block, rule }) = first_match(NAME_BLOCK_RULES, html) else {
        return NameAndHandle::default();
    };
    tracing::debug!(rule, "name block located");
    split_name_block(&block)
}

fn split_name_block(block: &str) -> NameAndHandle {
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_owned())
    };

    if let Some(caps) = HANDLE_ELEMENT.captures(block)
        && let (Some(whole), Some(handle)) = (caps.get(0), caps.get(1))
    {
        return NameAndHandle {
            name: non_empty(&fragment_to_line(&block[..=whole.start()])),
            handle: Some(handle.as_str().to_owned()),
        };
    }

    // No dedicated handle element: split the flattened text on the first
    // `@handle` token.
    let text = fragment_to_line(block);
    match HANDLE_IN_TEXT.captures(&text) {
        Some(caps) => {
            let (Some(whole), Some(handle)) = (caps.get(0), caps.get(1)) else {
                return NameAndHandle::default();
            };
            NameAndHandle {
                name: non_empty(&text[..whole.start()]),
                handle: Some(handle.as_str().to_owned()),
            }
        },
        None => NameAndHandle {
            name: non_empty(&text),
            handle: None,
        },
    }
}

fn handle_from_profile_link(html: &str) -> Option<String> {
    PROFILE_STATUS_LINK
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .find(|handle| *handle != "i")
        .map(str::to_owned)
}

/// Derive the handle from the canonical `/{handle}/status/` link pattern.
pub fn extract_handle_fallback(html: &str) -> Option<String> {
    first_match(HANDLE_FALLBACK_RULES, html).map(|m| {
        tracing::debug!(rule = m.rule, "handle derived from link");
        m.value
    })
}

// ── Avatar ──────────────────────────────────────────────────────────────────

const AVATAR_RULES: &[Rule<String>] = &[
    Rule::new("avatar-container-img", |html| group(&AVATAR_CONTAINER_IMG, html, 1)),
    Rule::new("avatar-marker-src", |html| group(&AVATAR_MARKER_SRC, html, 1)),
    Rule::new("profile-image-url", |html| group(&PROFILE_IMAGE_URL, html, 1)),
];

pub fn extract_avatar(html: &str) -> Option<String> {
    first_match(AVATAR_RULES, html).map(|m| {
        tracing::debug!(rule = m.rule, "avatar located");
        m.value.replace("&amp;", "&")
    })
}

// ── Verification ────────────────────────────────────────────────────────────

/// Resolve the verification tier from the badge element.
///
/// A badge with no tier hint is a standard badge. Hints are read from the
/// badge element itself (from its opening tag through `</svg>`).
pub fn extract_verification(html: &str) -> Verification {
    let Some(marker) = html.find(VERIFIED_MARKER) else {
        return Verification::Unverified;
    };
    let tag_start = html[..marker].rfind('<').unwrap_or(marker);
    let after = &html[marker..];
    let end = after
        .find(SVG_CLOSE)
        .map(|i| i + SVG_CLOSE.len())
        .filter(|&end| end <= BADGE_REGION_LIMIT)
        .or_else(|| after.find('>').map(|i| i + 1))
        .unwrap_or(after.len());
    let region = html[tag_start..marker + end].to_ascii_lowercase();

    if region.contains("gold") || region.contains("organization") {
        Verification::Organization
    } else if region.contains("gray") || region.contains("government") {
        Verification::Government
    } else {
        Verification::Standard
    }
}

// ── Main text ───────────────────────────────────────────────────────────────

/// The text container: its opening-tag attributes and raw inner markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextContainer {
    pub attributes: String,
    pub inner: String,
    /// Byte offset of the container's opening tag in the searched markup.
    pub start: usize,
}

fn text_container(re: &Regex, html: &str) -> Option<TextContainer> {
    let caps = re.captures(html)?;
    Some(TextContainer {
        attributes: caps.get(1)?.as_str().to_owned(),
        inner: caps.get(2)?.as_str().to_owned(),
        start: caps.get(0)?.start(),
    })
}

const TEXT_CONTAINER_RULES: &[Rule<TextContainer>] = &[
    Rule::new("text-container-closed", |html| {
        text_container(&TEXT_CONTAINER_CLOSED, html)
    }),
    Rule::new("text-container-open", |html| {
        text_container(&TEXT_CONTAINER_OPEN, html)
    }),
];

pub fn locate_text_container(html: &str) -> Option<TextContainer> {
    first_match(TEXT_CONTAINER_RULES, html).map(|m| {
        tracing::debug!(rule = m.rule, "text container located");
        m.value
    })
}

fn is_internal_link(href: &str) -> bool {
    href.starts_with('/')
        || INTERNAL_LINK_PATTERNS
            .iter()
            .any(|pattern| href.contains(pattern))
}

/// Replace anchors with their target URL.
///
/// External links (including `t.co` redirects) lose their truncated
/// visible label. Same-site hashtag, search and mention links keep only
/// their label. The replacement is padded with spaces so it never fuses
/// with adjacent text; whitespace normalization drops the extra padding.
pub fn expand_links(html: &str) -> String {
    ANCHOR
        .replace_all(html, |caps: &regex::Captures<'_>| {
            let href = caps.get(1).map_or("", |m| m.as_str());
            let label = caps.get(2).map_or("", |m| m.as_str());
            if is_internal_link(href) {
                format!(" {label} ")
            } else {
                format!(" {href} ")
            }
        })
        .into_owned()
}

/// Render the inner markup of a text container to clean text.
pub fn render_text(inner: &str) -> String {
    fragment_to_text(&expand_links(inner))
}

/// Main text of the first text container, or `None` when there is none.
pub fn extract_text(html: &str) -> Option<String> {
    locate_text_container(html)
        .map(|container| render_text(&container.inner))
        .filter(|text| !text.is_empty())
}

// ── Direction ───────────────────────────────────────────────────────────────

/// Text direction from the container's `dir` attribute.
///
/// When the container has no explicit `rtl`/`ltr` value, any
/// `dir="rtl"` in `html` marks the text right-to-left.
pub fn extract_direction(container_attributes: Option<&str>, html: &str) -> TextDirection {
    if let Some(attrs) = container_attributes
        && let Some(dir) = group(&DIR_ATTR, attrs, 1)
    {
        match dir.to_ascii_lowercase().as_str() {
            "rtl" => return TextDirection::Rtl,
            "ltr" => return TextDirection::Ltr,
            _ => {},
        }
    }

    if html.contains(r#"dir="rtl""#) {
        TextDirection::Rtl
    } else {
        TextDirection::Ltr
    }
}

// ── Timestamp ───────────────────────────────────────────────────────────────

const TIMESTAMP_RULES: &[Rule<DateTime<Utc>>] = &[Rule::new("time-datetime", |html| {
    let raw = group(&TIME_DATETIME, html, 1)?;
    DateTime::parse_from_rfc3339(&raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
})];

/// Creation time from the first machine-readable `datetime` attribute.
pub fn extract_timestamp(html: &str) -> Option<DateTime<Utc>> {
    first_match(TIMESTAMP_RULES, html).map(|m| m.value)
}

// ── Quoted post ─────────────────────────────────────────────────────────────

/// Outcome of looking for a quoted post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteLookup {
    /// No quote container on the page.
    Absent,
    Found(QuotedTweet),
    /// A quote container exists but holds no readable text.
    Unreadable,
}

/// Markup before the first quote container; the main post's own fields
/// live here.
pub fn main_region(html: &str) -> &str {
    html.find(QUOTE_MARKER).map_or(html, |i| &html[..i])
}

/// Offset where the post that contains `html[0]` ends: the next article
/// marker or `</article>`, whichever comes first.
fn post_end(html: &str) -> usize {
    [html.find(ARTICLE_MARKER), html.find(ARTICLE_CLOSE)]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(html.len())
}

/// Offset just past the tag that closes the element opened at `start`.
///
/// Counts opening and closing tags with the same name; `None` when `start`
/// is not an opening tag or the element is never closed.
fn closing_tag_end(html: &str, start: usize) -> Option<usize> {
    let mut tags = MARKUP_TAG.captures_iter(&html[start..]);
    let open = tags.next()?;
    if open.get(0)?.start() != 0 || !open.get(1)?.as_str().is_empty() {
        return None;
    }
    let name = open.get(2)?.as_str();

    let mut depth = 1usize;
    for tag in tags {
        let (Some(whole), Some(slash), Some(tag_name)) = (tag.get(0), tag.get(1), tag.get(2))
        else {
            continue;
        };
        if !tag_name.as_str().eq_ignore_ascii_case(name) {
            continue;
        }
        if !slash.as_str().is_empty() {
            depth -= 1;
            if depth == 0 {
                return Some(start + whole.end());
            }
        } else if !whole.as_str().ends_with("/>") {
            depth += 1;
        }
    }
    None
}

/// Byte range of the first quote card, from its opening tag to its closing
/// tag.
///
/// An unclosed card ends where its post ends.
pub fn quote_card(html: &str) -> Option<Range<usize>> {
    let marker = html.find(QUOTE_MARKER)?;
    let start = html[..marker].rfind('<').unwrap_or(marker);
    let body = marker + QUOTE_MARKER.len();
    let end = closing_tag_end(html, start).unwrap_or_else(|| body + post_end(&html[body..]));
    Some(start..end)
}

/// Markup of the quoting post that follows the quote card, up to the end of
/// that post. `None` without a quote card.
pub fn after_quote(html: &str) -> Option<&str> {
    let card = quote_card(html)?;
    let rest = &html[card.end..];
    Some(&rest[..post_end(rest)])
}

/// Extract the quoted post, one level deep.
///
/// The quote region is the quote card, cut where a nested quote container
/// begins, so neither a quote inside the quote nor a later post on the
/// page is ever read.
pub fn extract_quote(html: &str) -> QuoteLookup {
    let Some(card) = quote_card(html) else {
        return QuoteLookup::Absent;
    };
    let card = &html[card];
    let body = card
        .find(QUOTE_MARKER)
        .map_or(card, |marker| &card[marker + QUOTE_MARKER.len()..]);
    let region = body.find(QUOTE_MARKER).map_or(body, |nested| &body[..nested]);

    let Some(container) = locate_text_container(region) else {
        return QuoteLookup::Unreadable;
    };
    let text = render_text(&container.inner);
    if text.is_empty() {
        return QuoteLookup::Unreadable;
    }

    let author = first_match(NAME_BLOCK_RULES, &region[..container.start])
        .map(|m| fragment_to_line(&m.value))
        .unwrap_or_default();

    QuoteLookup::Found(QuotedTweet { author, text })
}

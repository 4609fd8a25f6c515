//! Text normalization for markup fragments.
//!
//! Every function here is pure. The main-text and quoted-text extractors
//! share [`fragment_to_text`], which applies the steps in a fixed order:
//! emoji images become their alt text, line-break tags become newlines,
//! remaining tags are stripped, entities are decoded, and finally
//! whitespace is normalized with [`clean_text_preserve_newlines`].

use std::sync::LazyLock;

use regex::Regex;

use crate::rules::compile;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| compile(r"\s+"));
static HORIZONTAL_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| compile(r"[^\S\n]+"));
static EXCESS_NEWLINES: LazyLock<Regex> = LazyLock::new(|| compile(r"\n{3,}"));
static LINE_BREAK_TAG: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)<br\s*/?\s*>"));
static BLOCK_CLOSE_TAG: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)</(?:div|p)\s*>"));
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| compile(r"<[^>]*>"));
static EMOJI_IMG: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"(?i)<img\b[^>]*?\balt="([^"]*)"[^>]*>"#));

/// Collapse every whitespace run (newlines included) to one space and trim.
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Normalize whitespace while keeping line structure.
///
/// Horizontal whitespace runs become one space, every line is trimmed,
/// three or more consecutive newlines collapse to two, and the result is
/// trimmed. Applying it twice gives the same output as applying it once.
pub fn clean_text_preserve_newlines(text: &str) -> String {
    let text = HORIZONTAL_WHITESPACE.replace_all(text, " ");
    let lines: Vec<&str> = text.split('\n').map(str::trim).collect();
    let joined = lines.join("\n");
    EXCESS_NEWLINES
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

/// Turn `<br>` and closing `</p>` / `</div>` tags into one newline each.
pub fn line_breaks_to_newlines(html: &str) -> String {
    let text = LINE_BREAK_TAG.replace_all(html, "\n");
    BLOCK_CLOSE_TAG.replace_all(&text, "\n").into_owned()
}

/// Remove every tag, keeping the text between them.
pub fn strip_tags(html: &str) -> String {
    ANY_TAG.replace_all(html, "").into_owned()
}

/// Replace image-based emoji with their textual alternative.
pub fn emoji_to_text(html: &str) -> String {
    EMOJI_IMG.replace_all(html, "$1").into_owned()
}

/// Decode named and numeric character references.
///
/// Unknown or malformed references are left as-is.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi > 1 && semi <= 12)
            .and_then(|semi| decode_entity(&tail[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            },
            None => {
                out.push('&');
                rest = &tail[1..];
            },
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        },
    }
}

/// Convert a markup fragment to clean, newline-preserving text.
pub fn fragment_to_text(html: &str) -> String {
    let text = emoji_to_text(html);
    let text = line_breaks_to_newlines(&text);
    let text = strip_tags(&text);
    let text = decode_entities(&text);
    clean_text_preserve_newlines(&text)
}

/// Strip tags and collapse all whitespace; for single-line fields.
pub fn fragment_to_line(html: &str) -> String {
    clean_text(&decode_entities(&strip_tags(&emoji_to_text(html))))
}

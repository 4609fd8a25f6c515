#![allow(clippy::unwrap_used, clippy::expect_used)]
use {
    chrono::{DateTime, Utc},
    sumariza_extract::{ExtractError, Field, TextDirection, Verification, extract},
};

fn page(article: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>Post</title></head>\n<body>\n<article data-testid=\"tweet\">{article}</article>\n</body>\n</html>\n"
    )
}

fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

const BASIC: &str = r#"
    <div data-testid="User-Name">
        <span>John Doe</span>
        <a href="/johndoe/status/123">@johndoe</a>
    </div>
    <a href="/johndoe/status/123">
        <img data-testid="Tweet-User-Avatar" src="https://example.com/avatar.jpg"/>
    </a>
    <div data-testid="tweetText" dir="ltr">
        This is a test tweet content.
    </div>
    <time datetime="2026-01-01T12:00:00Z">12:00 PM · Jan 1, 2026</time>
"#;

const PARTIAL: &str = r#"
    <div data-testid="tweetText" dir="ltr">
        This is a test tweet content with missing author info.
    </div>
"#;

const RTL: &str = r#"
    <div data-testid="User-Name">
        <span>Ahmed</span>
        <a href="/ahmed/status/456">@ahmed</a>
    </div>
    <div data-testid="tweetText" dir="rtl">
        مرحبا بالعالم
    </div>
    <time datetime="2026-01-01T12:00:00Z">12:00 PM · Jan 1, 2026</time>
"#;

const VERIFIED: &str = r#"
    <div data-testid="User-Name">
        <span>Verified User</span>
        <a href="/verified/status/789">@verified</a>
        <svg data-testid="icon-verified"></svg>
    </div>
    <div data-testid="tweetText" dir="ltr">
        This is from a verified account.
    </div>
    <time datetime="2026-01-01T14:30:00Z">2:30 PM · Jan 1, 2026</time>
"#;

const QUOTE: &str = r#"
    <div data-testid="User-Name">
        <span>Quoter</span>
        <a href="/quoter/status/100">@quoter</a>
    </div>
    <div data-testid="tweetText" dir="ltr">
        Check out this tweet!
    </div>
    <div data-testid="quoteTweet">
        <div data-testid="User-Name">
            <span>Original Author</span>
        </div>
        <div data-testid="tweetText" dir="ltr">Original tweet content here</div>
    </div>
    <time datetime="2026-01-01T16:00:00Z">4:00 PM · Jan 1, 2026</time>
"#;

const NESTED_QUOTE: &str = r#"
    <div data-testid="tweetText">Outer post</div>
    <div data-testid="quoteTweet">
        <div data-testid="User-Name"><span>Middle</span></div>
        <div data-testid="tweetText">Middle post</div>
        <div data-testid="quoteTweet">
            <div data-testid="User-Name"><span>Inner</span></div>
            <div data-testid="tweetText">Inner post</div>
        </div>
    </div>
"#;

const EMPTY: &str = r#"
    <div>This tweet is unavailable.</div>
"#;

const RICH: &str = concat!(
    r#"<div data-testid="Tweet-User-Avatar"><div><a href="/rustlang"><img alt="" draggable="true" src="https://pbs.twimg.com/profile_images/1/rust_normal.jpg" class="css-9pa8cd"></a></div></div>"#,
    "\n",
    r#"<div data-testid="User-Name"><div><span>Rust Language</span><svg aria-label="Verified account" data-testid="icon-verified"><g><linearGradient id="gold-a"></linearGradient></g></svg></div><div><div><span>@rustlang</span><span>·</span></div></div></div>"#,
    "\n",
    r#"<div lang="en" dir="auto" data-testid="tweetText"><span>Rust 1.91 is out! </span><img alt="🦀" draggable="false" src="https://abs.twimg.com/emoji/v2/svg/1f980.svg"><br><span>Notes: </span><a href="https://t.co/xyz" rel="noopener noreferrer nofollow" target="_blank"><span aria-hidden="true">https://</span>blog.rust-lang.org/2025/…</a><br><br><br><span>Thanks to </span><a href="/rustfoundation">@rustfoundation</a><span> &amp; all </span><a href="/hashtag/rustlang?src=hashtag_click">#rustlang</a></div>"#,
    "\n",
    r#"<a href="/rustlang/status/1234567890"><time datetime="2025-10-30T15:04:05.000Z">3:04 PM</time></a>"#,
);

#[test]
fn basic_post_is_complete() {
    let out = extract(&page(BASIC)).unwrap();
    assert!(!out.partial, "missing: {:?}", out.missing);
    assert_eq!(out.author.name, "John Doe");
    assert_eq!(out.author.handle, "johndoe");
    assert_eq!(out.author.avatar_url, "https://example.com/avatar.jpg");
    assert_eq!(out.author.verification, Verification::Unverified);
    assert_eq!(out.content.text, "This is a test tweet content.");
    assert_eq!(out.content.direction, TextDirection::Ltr);
    assert_eq!(out.content.created_at, at("2026-01-01T12:00:00Z"));
    assert!(out.content.quoted.is_none());
}

#[test]
fn missing_author_info_is_partial() {
    let out = extract(&page(PARTIAL)).unwrap();
    assert!(out.partial);
    assert_eq!(out.missing, vec![Field::Name, Field::Handle, Field::Avatar]);
    assert_eq!(
        out.content.text,
        "This is a test tweet content with missing author info."
    );
    assert!(out.author.name.is_empty());
    assert!(!out.content.has_timestamp());
}

#[test]
fn right_to_left_text() {
    let out = extract(&page(RTL)).unwrap();
    assert_eq!(out.content.direction, TextDirection::Rtl);
    assert_eq!(out.content.text, "مرحبا بالعالم");
    assert_eq!(out.author.name, "Ahmed");
    assert_eq!(out.author.handle, "ahmed");
}

#[test]
fn verified_badge_without_tier_is_standard() {
    let out = extract(&page(VERIFIED)).unwrap();
    assert_eq!(out.author.verification, Verification::Standard);
    assert!(out.author.is_verified());
    assert_eq!(out.author.name, "Verified User");
    assert_eq!(out.content.created_at, at("2026-01-01T14:30:00Z"));
}

#[test]
fn quoted_post_is_extracted() {
    let out = extract(&page(QUOTE)).unwrap();
    assert_eq!(out.author.name, "Quoter");
    assert_eq!(out.author.handle, "quoter");
    assert_eq!(out.content.text, "Check out this tweet!");

    let quoted = out.content.quoted.expect("quote");
    assert_eq!(quoted.author, "Original Author");
    assert_eq!(quoted.text, "Original tweet content here");

    // The main post's time element sits after the quote card.
    assert_eq!(out.content.created_at, at("2026-01-01T16:00:00Z"));
}

#[test]
fn quotes_are_one_level_deep() {
    let out = extract(&page(NESTED_QUOTE)).unwrap();
    assert_eq!(out.content.text, "Outer post");
    let quoted = out.content.quoted.expect("quote");
    assert_eq!(quoted.author, "Middle");
    assert_eq!(quoted.text, "Middle post");
    assert!(!out.missing.contains(&Field::QuotedText));
}

#[test]
fn quote_without_text_marks_partial() {
    let html = page(&format!(
        "{BASIC}<div data-testid=\"quoteTweet\"><img src=\"https://example.com/media.jpg\"></div>"
    ));
    let out = extract(&html).unwrap();
    assert!(out.content.quoted.is_none());
    assert!(out.partial);
    assert_eq!(out.missing, vec![Field::QuotedText]);
}

#[test]
fn unavailable_post_has_no_essential_text() {
    assert_eq!(
        extract(&page(EMPTY)).unwrap_err(),
        ExtractError::EssentialTextNotFound
    );
    assert_eq!(
        extract("").unwrap_err(),
        ExtractError::EssentialTextNotFound
    );
}

#[test]
fn minimal_hello_world() {
    let out = extract(r#"<div data-testid="tweetText" dir="ltr">Hello World</div>"#).unwrap();
    assert_eq!(out.content.text, "Hello World");
    assert_eq!(out.content.direction, TextDirection::Ltr);
}

#[test]
fn rendered_markup_end_to_end() {
    let out = extract(&page(RICH)).unwrap();
    assert!(!out.partial, "missing: {:?}", out.missing);
    assert_eq!(out.author.name, "Rust Language");
    assert_eq!(out.author.handle, "rustlang");
    assert_eq!(
        out.author.avatar_url,
        "https://pbs.twimg.com/profile_images/1/rust_normal.jpg"
    );
    assert_eq!(out.author.verification, Verification::Organization);
    assert_eq!(
        out.content.text,
        "Rust 1.91 is out! 🦀\nNotes: https://t.co/xyz\n\nThanks to @rustfoundation & all #rustlang"
    );
    assert_eq!(out.content.direction, TextDirection::Ltr);
    assert_eq!(out.content.created_at, at("2025-10-30T15:04:05Z"));
}

#[test]
fn mention_in_text_is_not_the_author() {
    let html = page(concat!(
        r#"<div><div><div data-testid="User-Name"><span>Jane Roe</span><span>@janeroe</span></div>"#,
        r#"<div data-testid="Tweet-User-Avatar"><img src="https://example.com/jane.jpg"></div>"#,
        r#"<div data-testid="tweetText"><span>thanks </span><a href="/bob">@bob</a></div></div></div>"#,
    ));
    let out = extract(&html).unwrap();
    assert!(!out.partial, "missing: {:?}", out.missing);
    assert_eq!(out.author.name, "Jane Roe");
    assert_eq!(out.author.handle, "janeroe");
    assert_eq!(out.content.text, "thanks @bob");
}

#[test]
fn main_time_after_quote_card_wins_over_quoted_time() {
    let html = page(concat!(
        r#"<div data-testid="tweetText">main post</div>"#,
        r#"<div data-testid="quoteTweet"><div data-testid="User-Name"><span>Q</span>"#,
        r#"<time datetime="2020-05-05T00:00:00Z">May 5, 2020</time></div>"#,
        r#"<div data-testid="tweetText">quoted post</div></div>"#,
        r#"<a href="/main/status/1"><time datetime="2026-01-01T00:00:00Z">Jan 1</time></a>"#,
    ));
    let out = extract(&html).unwrap();
    assert_eq!(out.content.created_at, at("2026-01-01T00:00:00Z"));
    assert_eq!(out.content.quoted.unwrap().text, "quoted post");
}

#[test]
fn media_only_quote_ignores_replies_below() {
    let html = format!(
        "{}<article data-testid=\"tweet\"><div data-testid=\"tweetText\">a reply below</div></article>",
        page(&format!(
            "{BASIC}<div data-testid=\"quoteTweet\"><div data-testid=\"User-Name\"><span>Q</span></div><img src=\"https://example.com/media.jpg\"></div>"
        ))
    );
    let out = extract(&html).unwrap();
    assert!(out.content.quoted.is_none());
    assert_eq!(out.missing, vec![Field::QuotedText]);
    assert_eq!(out.content.text, "This is a test tweet content.");
}

#[test]
fn links_do_not_fuse_with_neighbouring_text() {
    let html = page(
        r#"<div data-testid="tweetText"><span>see:</span><a href="https://t.co/abc">example.com/x…</a><span>!</span></div>"#,
    );
    assert_eq!(extract(&html).unwrap().content.text, "see: https://t.co/abc !");
}

#[test]
fn extraction_becomes_a_tweet() {
    let tweet = extract(&page(BASIC)).unwrap().into_tweet("123");
    assert_eq!(tweet.id, "123");
    assert!(tweet.username.is_empty());
    assert!(!tweet.partial);
    assert_eq!(tweet.author.handle, "johndoe");
}

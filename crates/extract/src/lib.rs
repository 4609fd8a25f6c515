//! Structured extraction of a single post from its fully rendered page.
//!
//! The page markup is treated as an untrusted, loosely structured string.
//! Fields are located with ordered pattern rules, so a missing or reshaped
//! element degrades that field instead of failing the whole extraction.
//! Only the main text is essential.
//!
//! ```ignore
//! let extraction = sumariza_extract::extract(&html)?;
//! let tweet = extraction.into_tweet("1234567890");
//! ```

pub mod engine;
pub mod fields;
pub mod model;
pub mod normalize;
pub mod rules;

pub use {
    engine::{ExtractError, Extraction, Field, extract},
    model::{Author, Content, QuotedTweet, TextDirection, Tweet, Verification},
};

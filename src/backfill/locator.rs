//! Image locator for record bodies
//!
//! Finds the first `<img ... src="...">`-shaped tag in raw markup and returns
//! its URL. This is a single regex scan, not an HTML parse:
//!
//! - the tag name match is case-insensitive
//! - the value may be single- or double-quoted
//! - the tag match runs up to the first closing `>`
//! - the first structural match wins, even inside an HTML comment or when an
//!   unrelated attribute such as `data-src` precedes the real `src`

use regex::Regex;

const IMG_SRC_PATTERN: &str = r#"(?i)<img[^>]+?src=['"]([^'"]+)['"][^>]*>"#;

/// Extracts the first image URL from record markup
#[derive(Debug, Clone)]
pub struct ImageLocator {
    pattern: Regex,
}

impl ImageLocator {
    pub fn new() -> Self {
        Self {
            // The pattern is a constant; failing to compile it is a programming error
            pattern: Regex::new(IMG_SRC_PATTERN).expect("image tag pattern is valid"),
        }
    }

    /// Returns the `src` value of the first image tag, or None if there is none
    ///
    /// # Example
    ///
    /// ```
    /// use featured_backfill::backfill::ImageLocator;
    ///
    /// let locator = ImageLocator::new();
    /// let body = r#"<p>Intro</p><img src="https://cdn.example.com/a.png"><img src="b.png">"#;
    /// assert_eq!(locator.locate(body), Some("https://cdn.example.com/a.png"));
    /// ```
    pub fn locate<'a>(&self, body: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(body)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str())
    }
}

impl Default for ImageLocator {
    fn default() -> Self {
        Self::new()
    }
}

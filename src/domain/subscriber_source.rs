use unicode_segmentation::UnicodeSegmentation;

pub const DEFAULT_SOURCE: &str = "website";
const MAX_CHAR_LENGHT: usize = 64;
const FORBIDDEN_CHARS: [char; 9] = ['/', '{', '}', '"', '>', '<', '\\', '(', ')'];

/// Free-text label telling where a signup came from (landing page, waitlist widget...).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SubscriberSource(String);

impl SubscriberSource {
    pub fn parse(source: String) -> Result<SubscriberSource, String> {
        let trimmed = source.trim();
        let is_empty = trimmed.is_empty();
        let is_too_long = trimmed.graphemes(true).count() > MAX_CHAR_LENGHT;
        let contains_forbidden_chars = trimmed.chars().any(|char| FORBIDDEN_CHARS.contains(&char));

        if is_empty || is_too_long || contains_forbidden_chars {
            return Err(format!("{} is not a valid subscription source", source));
        }

        Ok(Self(trimmed.to_string()))
    }
}

impl Default for SubscriberSource {
    fn default() -> Self {
        Self(String::from(DEFAULT_SOURCE))
    }
}

impl AsRef<str> for SubscriberSource {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

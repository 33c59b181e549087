//! Post and comment text rules.

use time::{format_description::BorrowedFormatItem, macros::format_description};

use crate::domain::error::DomainError;

/// Number of characters used when a post is shown by its text.
pub const POST_HEADLINE_CHARS: usize = 15;
/// Characters of post text used in a detail page title.
pub const POST_TITLE_CHARS: usize = 30;

pub const HUMAN_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day padding:none] [month repr:long] [year]");
pub const ISO_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Validated, trimmed body text of a post or comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostText(String);

impl PostText {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("text must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// First `max_chars` characters of `text`, counted as chars rather than bytes.
pub fn headline(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Like [`headline`] but appends an ellipsis when the text was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}…", head.trim_end())
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_rejected() {
        assert!(matches!(
            PostText::parse("   \n"),
            Err(DomainError::Validation { .. })
        ));
    }

    #[test]
    fn text_is_trimmed() {
        let text = PostText::parse("  hello  ").expect("valid text");
        assert_eq!(text.as_str(), "hello");
    }

    #[test]
    fn headline_counts_chars_not_bytes() {
        assert_eq!(headline("привет мир", 6), "привет");
        assert_eq!(headline("short", 15), "short");
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate_chars("abcdef", 3), "abc…");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }
}

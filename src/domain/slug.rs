//! Group slug derivation and validation.
//!
//! Slugs are the URL keys of groups (`/group/{slug}/`). Human titles are
//! slugified with the `slug` crate, which transliterates non-ASCII text, and
//! callers provide an async uniqueness predicate so the derivation stays pure.

use std::future::Future;

use slug::slugify;
use thiserror::Error;

pub const SLUG_MAX_CHARS: usize = 50;
const MAX_SUFFIX_ATTEMPTS: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("slug `{slug}` may contain only latin letters, digits, hyphens and underscores")]
    InvalidCharacters { slug: String },
    #[error("slug must be at most {SLUG_MAX_CHARS} characters")]
    TooLong,
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// Derive a slug from a human-readable group title.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let mut candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    if candidate.chars().count() > SLUG_MAX_CHARS {
        candidate = candidate
            .chars()
            .take(SLUG_MAX_CHARS)
            .collect::<String>()
            .trim_end_matches('-')
            .to_string();
    }

    Ok(candidate)
}

/// Check an explicitly supplied slug.
pub fn validate_slug(slug: &str) -> Result<(), SlugError> {
    if slug.is_empty() {
        return Err(SlugError::EmptyInput);
    }
    if slug.chars().count() > SLUG_MAX_CHARS {
        return Err(SlugError::TooLong);
    }
    if !slug
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(SlugError::InvalidCharacters {
            slug: slug.to_string(),
        });
    }
    Ok(())
}

/// Derive a slug and retry with `-2`, `-3`, … until `is_unique` accepts it.
pub async fn generate_unique_slug_async<F, Fut, E>(
    input: &str,
    mut is_unique: F,
) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let base = derive_slug(input)?;

    if is_unique(&base).await.map_err(SlugAsyncError::Predicate)? {
        return Ok(base);
    }

    for attempt in 2..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = format!("{base}-{attempt}");
        if is_unique(&candidate)
            .await
            .map_err(SlugAsyncError::Predicate)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted { base }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_lowercases_and_joins_words() {
        assert_eq!(derive_slug("Cats & Dogs").expect("slug"), "cats-dogs");
    }

    #[test]
    fn derive_slug_transliterates_cyrillic() {
        let slug = derive_slug("Лев Толстой").expect("slug");
        assert!(!slug.is_empty());
        assert!(validate_slug(&slug).is_ok());
    }

    #[test]
    fn derive_slug_rejects_blank_input() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn derive_slug_caps_length() {
        let slug = derive_slug(&"word ".repeat(40)).expect("slug");
        assert!(slug.chars().count() <= SLUG_MAX_CHARS);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn validate_slug_rules() {
        assert!(validate_slug("test-slug_1").is_ok());
        assert_eq!(validate_slug(""), Err(SlugError::EmptyInput));
        assert!(matches!(
            validate_slug("with space"),
            Err(SlugError::InvalidCharacters { .. })
        ));
        assert_eq!(validate_slug(&"a".repeat(51)), Err(SlugError::TooLong));
    }

    #[tokio::test]
    async fn unique_slug_appends_counter() {
        use std::sync::Arc;
        use tokio::sync::Mutex;

        let existing = Arc::new(Mutex::new(vec!["leo-tolstoy".to_string()]));

        let slug = generate_unique_slug_async("Leo Tolstoy", |candidate| {
            let existing = existing.clone();
            let candidate = candidate.to_string();
            async move {
                let mut guard = existing.lock().await;
                if guard.contains(&candidate) {
                    Ok::<bool, std::convert::Infallible>(false)
                } else {
                    guard.push(candidate);
                    Ok(true)
                }
            }
        })
        .await
        .expect("unique slug");

        assert_eq!(slug, "leo-tolstoy-2");
    }

    #[tokio::test]
    async fn unique_slug_exhausts() {
        let result = generate_unique_slug_async("Example", |_| async {
            Ok::<bool, std::convert::Infallible>(false)
        })
        .await;

        assert!(matches!(
            result,
            Err(SlugAsyncError::Slug(SlugError::Exhausted { .. }))
        ));
    }
}

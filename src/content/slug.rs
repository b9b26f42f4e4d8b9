//! Slug derivation and uniqueness probing for posts.

use uuid::Uuid;

use crate::repo::{ContentRepo, RepoError};

/// Used when a title has nothing slug-worthy in it.
pub const PLACEHOLDER_SLUG: &str = "untitled-post";

/// Lower-case, hyphen-separated form of a title.
///
/// Letters and digits survive (including non-Latin scripts), whitespace and
/// underscores become single hyphens, everything else is dropped.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.trim().to_lowercase().chars() {
        if c.is_alphanumeric() && !c.is_uppercase() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        PLACEHOLDER_SLUG.to_string()
    } else {
        slug
    }
}

/// First free slug among `base`, `base-2`, `base-3`, ... for posts other than `exclude`.
pub async fn resolve_unique_slug(
    repo: &dyn ContentRepo,
    base: &str,
    exclude: Option<Uuid>,
) -> Result<String, RepoError> {
    let mut candidate = base.to_string();
    let mut suffix = 2u32;

    while repo.post_slug_taken(&candidate, exclude).await? {
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }

    Ok(candidate)
}

//! URL slugs for listings.

use uuid::Uuid;

/// Maximum length of the title-derived part of a slug.
pub const MAX_SLUG_BASE_LEN: usize = 60;

/// Length of the random suffix appended to every generated slug.
pub const SLUG_SUFFIX_LEN: usize = 6;

/// Turn a title into a lowercase, dash-separated slug base.
///
/// Runs of anything other than ASCII letters and digits collapse into a
/// single dash; leading and trailing dashes are dropped.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.len() > MAX_SLUG_BASE_LEN {
        slug.truncate(MAX_SLUG_BASE_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    slug
}

/// Generate a fresh slug for a new listing.
///
/// The random suffix keeps slugs unique when two listings share a title.
pub fn generate_slug(title: &str) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(SLUG_SUFFIX_LEN)
        .collect();

    let base = slugify(title);
    if base.is_empty() {
        format!("listing-{}", suffix)
    } else {
        format!("{}-{}", base, suffix)
    }
}

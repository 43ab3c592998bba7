//! Version-scoped cache key derivation.

/// Fixed namespace prefix of every verdict cache key.
pub const CACHE_KEY_NAMESPACE: &str = "hqcheck.hq";

/// Derive the verdict cache key for a product version.
///
/// The product version is the only input, so upgrading the product
/// invalidates every verdict cached by the previous version.
///
/// Example: `3.2.1` becomes `hqcheck.hq-3-2-1.response`
pub fn cache_key(product_version: &str) -> String {
    format!(
        "{}-{}.response",
        CACHE_KEY_NAMESPACE,
        parameterize(product_version)
    )
}

/// Lowercase and collapse every run of characters outside `[a-z0-9_]`
/// into a single `-`, trimming separators at both ends.
pub fn parameterize(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_separator = false;

    for c in input.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// Turn a human-entered name into a slug.
///
/// The result is lower-cased and every run of whitespace becomes a single
/// underscore. Any other character is kept as-is, so normalizing an existing
/// slug returns it unchanged.
pub fn normalize_slug(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Whether `slug` is already in normalized form.
pub fn is_normalized(slug: &str) -> bool {
    normalize_slug(slug) == slug
}

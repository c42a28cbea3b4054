use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("static slug regex compiles"));
static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-\s]+").expect("static slug regex compiles"));

/// Converts a human-readable name into a store name.
///
/// Accents are decomposed and dropped, anything that is not a word character,
/// whitespace or hyphen is removed, runs of whitespace and hyphens collapse to a
/// single `-`, and leading/trailing `-`/`_` are stripped.
#[must_use]
pub fn slugify(value: &str) -> String {
    let ascii: String = value.nfkd().filter(char::is_ascii).collect();
    let lowered = ascii.to_lowercase();
    let cleaned = DISALLOWED.replace_all(&lowered, "");
    let collapsed = SEPARATORS.replace_all(&cleaned, "-");
    collapsed.trim_matches(|c| c == '-' || c == '_').to_string()
}

use lazy_static::lazy_static;
use regex::Regex;

const TRIMMED: &[char] = &[' ', '\t', '\n', '\r', '\0', '\x0B'];

lazy_static! {
    static ref NON_SLUG: Regex = Regex::new(r"[^a-z0-9-]").unwrap();
    static ref HYPHENS: Regex = Regex::new(r"-+").unwrap();
}

/// Trims ASCII blanks, lower-cases ASCII letters, turns every character
/// outside `[a-z0-9-]` into a hyphen, then collapses hyphen runs.
pub fn slug(input: &str) -> String {
    let lowered = input.trim_matches(TRIMMED).to_ascii_lowercase();
    let replaced = NON_SLUG.replace_all(&lowered, "-");
    HYPHENS.replace_all(&replaced, "-").into_owned()
}

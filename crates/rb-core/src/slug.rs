//! # Slugs
//!
//! Post URLs use a slug derived from the title. Uniqueness is settled at
//! write time by suffixing `-2`, `-3`, ... to the base slug.

/// Used when a title has no letters or digits at all.
pub const FALLBACK_SLUG: &str = "post";

/// Static path segments under `/posts` that a slug must not shadow.
pub const RESERVED_SLUGS: [&str; 2] = ["feature", "upload-auth"];

/// Lowercases the title and collapses every run of non-alphanumeric
/// characters into a single `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

pub fn with_suffix(base: &str, n: u32) -> String {
    format!("{base}-{n}")
}

pub fn is_reserved(slug: &str) -> bool {
    RESERVED_SLUGS.contains(&slug)
}

/// The `n`-th slug tried by the de-duplication scan: `base` first, then
/// `base-2`, `base-3`, ...
pub fn candidate(base: &str, n: u32) -> String {
    if n <= 1 {
        base.to_string()
    } else {
        with_suffix(base, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_become_dashes() {
        assert_eq!(slugify("My Awesome Story"), "my-awesome-story");
    }

    #[test]
    fn punctuation_collapses() {
        assert_eq!(slugify("  Rust: 2024 -- what's new?  "), "rust-2024-what-s-new");
    }

    #[test]
    fn non_ascii_only_title_falls_back() {
        assert_eq!(slugify("日本語"), FALLBACK_SLUG);
        assert_eq!(slugify(""), FALLBACK_SLUG);
    }

    #[test]
    fn candidates_suffix_the_base() {
        let got: Vec<_> = (1..=4).map(|n| candidate("hello", n)).collect();
        assert_eq!(got, ["hello", "hello-2", "hello-3", "hello-4"]);
    }

    #[test]
    fn route_segments_are_reserved() {
        assert!(is_reserved("feature"));
        assert!(is_reserved("upload-auth"));
        assert!(!is_reserved("featured"));
    }
}

//! Leading list/outline markers.
//!
//! Paragraphs in RFC text often start with a bullet or an outline number.
//! Sending those to the backend mangles them, so the marker is cut off before
//! translation and glued back on afterwards.

use regex::Regex;
use std::sync::LazyLock;

/// One alternative per marker family; each marker ends with a single space:
/// bullets `- o * + $`, outlines `A.` `A.1.` `1.` `1.2.3`, enumerators
/// `(a)` `(1)` `a)` `1)`, brackets `[1]` `[ab]`, and letter-dot `a.`.
static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(
        r"^(?:[-o*+$] |(?:[A-Z]\.(?:\d{1,2}\.)*|(?:\d{1,2}\.)+)(?:\d{1,2})? |\(?[0-9a-z]\) |\[[0-9a-z]{1,2}\] |[a-z]\. )",
    )
    .unwrap()
});

/// Split `text` into `(marker, body)`.
///
/// At most one marker is removed. Without a marker the result is
/// `("", text)`. `marker + body` always reproduces `text`.
pub fn split_marker(text: &str) -> (&str, &str) {
    MARKER
        .find(text)
        .map_or(("", text), |m| text.split_at(m.end()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker_of(text: &str) -> &str {
        split_marker(text).0
    }

    #[test]
    fn test_bullets() {
        for bullet in ["- ", "o ", "* ", "+ ", "$ "] {
            let text = format!("{bullet}item text");
            assert_eq!(split_marker(&text), (bullet, "item text"), "bullet {bullet:?}");
        }
    }

    #[test]
    fn test_outline_numbers() {
        assert_eq!(split_marker("1. Scope"), ("1. ", "Scope"));
        assert_eq!(split_marker("1.2.3. Details"), ("1.2.3. ", "Details"));
        assert_eq!(split_marker("1.2.3 Details"), ("1.2.3 ", "Details"));
        assert_eq!(split_marker("12.4. Wire format"), ("12.4. ", "Wire format"));
        assert_eq!(split_marker("A. Appendix"), ("A. ", "Appendix"));
        assert_eq!(split_marker("A.1. Example"), ("A.1. ", "Example"));
    }

    #[test]
    fn test_enumerators() {
        assert_eq!(marker_of("(a) first"), "(a) ");
        assert_eq!(marker_of("(1) first"), "(1) ");
        assert_eq!(marker_of("a) first"), "a) ");
        assert_eq!(marker_of("1) first"), "1) ");
    }

    #[test]
    fn test_brackets_and_letter_dot() {
        assert_eq!(split_marker("[1] RFC 2119"), ("[1] ", "RFC 2119"));
        assert_eq!(split_marker("[ab] Some ref"), ("[ab] ", "Some ref"));
        assert_eq!(split_marker("b. second"), ("b. ", "second"));
    }

    #[test]
    fn test_only_one_marker_removed() {
        assert_eq!(split_marker("- - nested"), ("- ", "- nested"));
        assert_eq!(split_marker("1. a) both"), ("1. ", "a) both"));
    }

    #[test]
    fn test_no_marker() {
        assert_eq!(split_marker("Introduction"), ("", "Introduction"));
        assert_eq!(split_marker("-no space"), ("", "-no space"));
        assert_eq!(split_marker("[abc] too long"), ("", "[abc] too long"));
        assert_eq!(split_marker("100. three digits"), ("", "100. three digits"));
        assert_eq!(split_marker(""), ("", ""));
    }

    #[test]
    fn test_multiline_body_kept_whole() {
        assert_eq!(split_marker("- first line\nsecond"), ("- ", "first line\nsecond"));
    }

    #[test]
    fn test_marker_round_trip() {
        let samples = [
            "- bullet", "o bullet", "* bullet", "+ bullet", "$ bullet", "A. outline",
            "A.1. outline", "1. outline", "1.2.3. outline", "(a) enum", "1) enum", "a) enum",
            "[1] bracket", "[ab] bracket", "a. letter", "plain paragraph",
        ];
        for text in samples {
            let (marker, body) = split_marker(text);
            assert_eq!(format!("{marker}{body}"), text);
            let translated = format!("{marker}{}", body.to_uppercase());
            assert!(translated.starts_with(marker));
            assert_eq!(&translated[marker.len()..], body.to_uppercase());
        }
    }
}

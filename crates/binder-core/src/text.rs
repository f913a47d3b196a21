//! Plain-text helpers shared by split, merge, and import
//!
//! Word counts are computed the same way everywhere in the binder: markup
//! tags are stripped, the remainder is split on whitespace, and non-empty
//! tokens are counted.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Any markup tag, e.g. `<p>`, `</div>`, `<br/>`
    static ref TAG: Regex = Regex::new(r"<[^>]*>").unwrap();
}

/// Remove markup tags. Tags become spaces so adjacent paragraphs stay separate words.
pub fn strip_markup(content: &str) -> String {
    TAG.replace_all(content, " ").into_owned()
}

/// Count words in a (possibly marked-up) text payload.
pub fn word_count(content: &str) -> u32 {
    strip_markup(content).split_whitespace().count() as u32
}

/// Escape the characters that would otherwise be read as markup.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap each line in a paragraph element.
pub fn wrap_paragraphs<'a>(lines: impl IntoIterator<Item = &'a str>) -> String {
    lines
        .into_iter()
        .map(|line| format!("<p>{}</p>", escape_markup(line)))
        .collect()
}

/// Truncate a title to `max_chars` characters, appending `ellipsis` when cut.
pub fn truncate_title(title: &str, max_chars: usize, ellipsis: &str) -> String {
    if title.chars().count() <= max_chars {
        return title.to_string();
    }
    let mut cut: String = title.chars().take(max_chars).collect();
    cut.push_str(ellipsis);
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_ignoring_tags() {
        assert_eq!(word_count("<p>It was a dark and stormy night...</p>"), 7);
        assert_eq!(word_count("<p>one</p><p>two</p>"), 2);
        assert_eq!(word_count("   "), 0);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn counts_plain_text() {
        assert_eq!(word_count("Hello world"), 2);
        assert_eq!(word_count("Bye"), 1);
        assert_eq!(word_count("tabs\tand\nnewlines"), 3);
    }

    #[test]
    fn wraps_and_escapes() {
        assert_eq!(
            wrap_paragraphs(["a < b", "c"]),
            "<p>a &lt; b</p><p>c</p>"
        );
    }

    #[test]
    fn truncates_long_titles() {
        assert_eq!(truncate_title("Short", 50, "..."), "Short");
        let long = "x".repeat(60);
        let cut = truncate_title(&long, 50, "...");
        assert_eq!(cut.chars().count(), 53);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_title("ééééé", 3, "…"), "ééé…");
    }
}

//! Greedy word wrapping of bullet entries.

use textwrap::{Options, WordSeparator, WordSplitter, WrapAlgorithm};

/// Render `text` as a bullet entry without wrapping.
///
/// Lines after the first are indented to align with the text after the marker. Blank lines stay
/// empty.
pub fn bullet(marker: &str, text: &str) -> String {
    if text.is_empty() {
        return marker.to_owned();
    }

    let indent = hanging_indent(marker);
    let lines = text.lines().enumerate().map(|(index, line)| {
        if index == 0 {
            format!("{marker} {line}")
        } else if line.trim().is_empty() {
            String::new()
        } else {
            format!("{indent}{line}")
        }
    });
    trim_lines(lines)
}

/// Render `text` as a bullet entry wrapped to `width` columns.
///
/// Lines break only at spaces, first-fit. A word longer than the available width is kept whole
/// on its own line. Continuation lines are indented to align with the text after the marker.
pub fn wrap_bullet(marker: &str, text: &str, width: usize) -> String {
    if text.is_empty() {
        return marker.to_owned();
    }

    let initial_indent = format!("{marker} ");
    let subsequent_indent = hanging_indent(marker);

    let options = Options::new(width)
        .break_words(false)
        .word_separator(WordSeparator::AsciiSpace)
        .word_splitter(WordSplitter::NoHyphenation)
        .wrap_algorithm(WrapAlgorithm::FirstFit)
        .initial_indent(&initial_indent)
        .subsequent_indent(&subsequent_indent);

    trim_lines(textwrap::wrap(text, options).into_iter().map(String::from))
}

fn hanging_indent(marker: &str) -> String {
    " ".repeat(marker.chars().count() + 1)
}

// Indent-only lines collapse to empty ones.
fn trim_lines(lines: impl Iterator<Item = String>) -> String {
    lines
        .map(|line| line.trim_end().to_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn short_entries_stay_on_one_line() {
        assert_eq!(wrap_bullet("-", "Added X.", 80), "- Added X.");
    }

    #[test]
    fn breaks_at_spaces_and_indents_continuations() {
        let wrapped = wrap_bullet("-", "one two three four five", 12);
        assert_eq!(wrapped, "- one two\n  three four\n  five");
    }

    #[test]
    fn long_words_are_not_split() {
        let url = "[#1](https://example.com/a/very/long/path/to/pull/1)";
        let wrapped = wrap_bullet("-", &format!("Fixed it. {url}"), 20);
        assert_eq!(wrapped, format!("- Fixed it.\n  {url}"));
    }

    #[test]
    fn wider_markers_widen_the_indent() {
        let wrapped = wrap_bullet("**", "alpha beta gamma", 12);
        assert_eq!(wrapped, "** alpha\n   beta\n   gamma");
    }

    #[test]
    fn empty_text_renders_marker_only() {
        assert_eq!(wrap_bullet("-", "", 10), "-");
        assert_eq!(bullet("-", ""), "-");
        assert_eq!(bullet("*", "Text"), "* Text");
    }

    #[test]
    fn unwrapped_continuation_lines_are_indented() {
        let text = "First para.\n\nSecond para line.\nThird.";
        let expected = "- First para.\n\n  Second para line.\n  Third.";
        assert_eq!(bullet("-", text), expected);
        assert_eq!(wrap_bullet("-", text, 80), expected);
    }

    proptest! {
        #[test]
        fn rejoining_lines_restores_words(
            words in prop::collection::vec("[a-z]{1,12}", 1..30),
            width in 8usize..60,
        ) {
            let text = words.join(" ");
            let wrapped = wrap_bullet("-", &text, width);

            let rejoined: Vec<&str> = wrapped
                .lines()
                .flat_map(str::split_whitespace)
                .skip(1)
                .collect();
            prop_assert_eq!(rejoined, words.iter().map(String::as_str).collect::<Vec<_>>());

            for line in wrapped.lines() {
                let fits = line.chars().count() <= width;
                let single_word = line.trim_start().trim_start_matches('-').split_whitespace().count() == 1;
                prop_assert!(fits || single_word, "line {:?} exceeds {}", line, width);
            }
        }
    }
}

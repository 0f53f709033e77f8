//! Optional tidy-up of markdown returned by the normalizer model.
//!
//! Enabled with [`crate::config::NormalizerConfig::clean_output`]. The rules
//! are deterministic string passes that fix layout quirks local models tend
//! to produce without touching wording:
//!
//! 1. strip an outer ```` ```markdown ```` fence wrapped around the answer
//! 2. CRLF / CR → LF
//! 3. trim trailing whitespace per line
//! 4. collapse runs of blank lines down to two
//! 5. blank line before every heading
//! 6. drop zero-width and other invisible characters OCR engines leak
//! 7. exactly one trailing newline
//!
//! Order matters: line endings are normalised before anything splits on
//! `\n`, and the fence is removed before headings are detected.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every rule, in order.
pub fn clean_markdown(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = space_headings(&s);
    let s = remove_invisible_chars(&s);
    ensure_final_newline(&s)
}

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\r?\n(.*?)\r?\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n").into_owned()
}

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6}\s+\S").unwrap());

fn space_headings(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 32);
    let mut prev_blank = true;
    for line in input.lines() {
        if RE_HEADING.is_match(line) && !prev_blank {
            out.push('\n');
        }
        out.push_str(line);
        out.push('\n');
        prev_blank = line.is_empty();
    }
    out
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}'],
        "",
    )
}

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{trimmed}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fence() {
        assert_eq!(strip_outer_fence("```markdown\n# Invoice\nTotal\n```"), "# Invoice\nTotal");
        assert_eq!(strip_outer_fence("```\nplain\n```\n"), "plain");
    }

    #[test]
    fn inner_code_blocks_are_kept() {
        let input = "Intro\n```\ncode\n```\nOutro";
        assert_eq!(strip_outer_fence(input), input);
    }

    #[test]
    fn line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn blank_runs_collapse_to_one_empty_line() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn headings_get_a_blank_line_before() {
        let out = space_headings("Name: Jane\n## Items\n- pen");
        assert_eq!(out, "Name: Jane\n\n## Items\n- pen\n");
    }

    #[test]
    fn hash_without_space_is_not_a_heading() {
        let out = space_headings("total\n#42 order");
        assert_eq!(out, "total\n#42 order\n");
    }

    #[test]
    fn invisible_chars_removed() {
        assert_eq!(remove_invisible_chars("in\u{00AD}voice\u{200B} no\u{FEFF}"), "invoice no");
    }

    #[test]
    fn final_newline() {
        assert_eq!(ensure_final_newline("x"), "x\n");
        assert_eq!(ensure_final_newline("x\n\n\n"), "x\n");
        assert_eq!(ensure_final_newline("   "), "\n");
    }

    #[test]
    fn full_cleanup() {
        let raw =
            "```markdown\r\n# Receipt   \r\nShop\r\n\r\n\r\n\r\n## Lines\r\n- milk\u{200B}\r\n```";
        let out = clean_markdown(raw);
        assert_eq!(out, "# Receipt\nShop\n\n## Lines\n- milk\n");
    }
}

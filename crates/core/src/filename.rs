//! Filename canonicalization.

/// Extension appended to every generated name.
pub const EXTENSION: &str = ".pdf";

/// Turn a title into a filesystem-safe `snake_case` PDF filename.
///
/// The output always matches `^[a-z0-9_]*\.pdf$`. Characters outside ASCII
/// letters, digits and whitespace are dropped rather than transliterated.
/// Underscores count as whitespace, which makes the function idempotent on
/// its own output.
pub fn format_filename(text: &str) -> String {
    let lowered = text.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|&c| c.is_ascii_lowercase() || c.is_ascii_digit() || is_separator(c))
        .collect();

    let stem = kept
        .split(is_separator)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    format!("{stem}{EXTENSION}")
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == '_'
}

/// The name without its extension, if it has one.
pub fn stem(filename: &str) -> &str {
    filename.strip_suffix(EXTENSION).unwrap_or(filename)
}

/// Pick a name not yet in `taken`, appending `_2`, `_3`, ... to the stem.
pub fn dedupe_filename(filename: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(filename) {
        return filename.to_string();
    }

    let base = stem(filename);
    (2..)
        .map(|n| format!("{base}_{n}{EXTENSION}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| filename.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn is_canonical(name: &str) -> bool {
        let Some(stem) = name.strip_suffix(EXTENSION) else {
            return false;
        };
        stem.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }

    #[test]
    fn test_basic_title() {
        assert_eq!(
            format_filename("Annual Report 2023 Summary"),
            "annual_report_2023_summary.pdf"
        );
    }

    #[test]
    fn test_punctuation_removed() {
        assert_eq!(
            format_filename("Hello, World! (Draft #2)"),
            "hello_world_draft_2.pdf"
        );
    }

    #[test]
    fn test_whitespace_collapsed_and_trimmed() {
        assert_eq!(
            format_filename("  Many \t spaces\n here  "),
            "many_spaces_here.pdf"
        );
    }

    #[test]
    fn test_non_ascii_dropped() {
        assert_eq!(format_filename("Café Résumé Notes"), "caf_rsum_notes.pdf");
        assert_eq!(format_filename("דוח שנתי Report"), "report.pdf");
    }

    #[test]
    fn test_degenerate_input() {
        assert_eq!(format_filename(""), ".pdf");
        assert_eq!(format_filename("!!! ???"), ".pdf");
    }

    #[test]
    fn test_output_is_canonical() {
        let inputs = [
            "The Theory of Relativity Explained",
            "Quarterly Financial Report 2024",
            "A/B Testing: 10 Lessons - Part_1",
            "__leading and trailing__",
            "ÜBER große Straße",
            "tabs\tand\nnewlines",
            "日本語のタイトル with English",
        ];
        for input in inputs {
            let name = format_filename(input);
            assert!(is_canonical(&name), "{input:?} produced {name:?}");
        }
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let inputs = [
            "Annual Report 2023 Summary",
            "Hello, World! (Draft #2)",
            "  odd   spacing  ",
            "ÜBER große Straße",
        ];
        for input in inputs {
            let once = format_filename(input);
            let twice = format_filename(stem(&once));
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_dedupe_filename() {
        let taken: HashSet<&str> = ["report.pdf", "report_2.pdf"].into_iter().collect();
        assert_eq!(
            dedupe_filename("report.pdf", |n| taken.contains(n)),
            "report_3.pdf"
        );
        assert_eq!(
            dedupe_filename("summary.pdf", |n| taken.contains(n)),
            "summary.pdf"
        );
    }

    #[test]
    fn test_stem() {
        assert_eq!(stem("report.pdf"), "report");
        assert_eq!(stem("report"), "report");
    }
}

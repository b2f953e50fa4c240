use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

const LIGATURES: [(char, &str); 7] = [
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
];

/// Normalize one decoded string before it is split into glyphs.
///
/// NFC-composes, expands Latin ligatures and drops replacement and NUL
/// characters, so every later stage sees one `char` per visible letter.
pub fn normalize_fragment(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfc() {
        match c {
            '\u{FFFD}' | '\0' => {}
            c => match LIGATURES.iter().find(|(lig, _)| *lig == c) {
                Some((_, expanded)) => out.push_str(expanded),
                None => out.push(c),
            },
        }
    }
    out
}

/// Tidy assembled page text.
///
/// Repairs words hyphenated across a line break, squeezes long space runs,
/// strips trailing whitespace from each line and drops blank lines at the
/// start and end.
pub fn tidy_page_text(text: &str) -> String {
    static RE_HYPHEN: OnceLock<Regex> = OnceLock::new();
    let re_hyphen =
        RE_HYPHEN.get_or_init(|| Regex::new(r"([a-zA-Z])-[ \t]*\n[ \t]*([a-z])").unwrap());

    static RE_SPACES: OnceLock<Regex> = OnceLock::new();
    let re_spaces = RE_SPACES.get_or_init(|| Regex::new(r"[ \t]{3,}").unwrap());

    let joined = re_hyphen.replace_all(text, "$1$2");
    let squeezed = re_spaces.replace_all(&joined, "  ");

    squeezed
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}

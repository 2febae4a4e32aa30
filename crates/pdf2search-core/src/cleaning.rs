//! Normalization of extracted PDF text.
//!
//! Academic PDFs are full of typographic ligatures, bare page-number
//! lines, and ragged whitespace, all of which break search. The
//! normalizer is pure and idempotent.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// Explicit ligature expansion map, applied after NFKC. NFKC already
// decomposes these; the explicit pass covers non-conformant fonts.
const LIGATURES: [(char, &str); 7] = [
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
];

static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

fn expand_ligatures(text: &str) -> String {
    let mut out: String = text.nfkc().collect();
    for (ligature, expansion) in LIGATURES {
        if out.contains(ligature) {
            out = out.replace(ligature, expansion);
        }
    }
    out
}

/// Clean extracted PDF text.
///
/// - Expands Unicode ligatures to ASCII (NFKC + explicit map)
/// - Normalizes line endings to `\n`
/// - Drops lines that are only digits (page numbers)
/// - Collapses whitespace runs within lines
/// - Collapses 3+ consecutive blank lines to 2
pub fn clean_text(raw: &str) -> String {
    let text = expand_ligatures(raw);
    let text = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut cleaned_lines: Vec<String> = Vec::new();
    for line in text.split('\n') {
        let stripped = line.trim();
        if !stripped.is_empty() && stripped.chars().all(char::is_numeric) {
            continue;
        }
        if stripped.is_empty() {
            cleaned_lines.push(String::new());
        } else {
            cleaned_lines.push(stripped.split_whitespace().collect::<Vec<_>>().join(" "));
        }
    }

    let joined = cleaned_lines.join("\n");
    BLANK_RUNS.replace_all(&joined, "\n\n").trim().to_string()
}

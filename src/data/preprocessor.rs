// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Normalises raw corpus text (and user input at correction time)
// so the vocabulary is not wasted on layout characters.
//
// Cleaning steps (applied in order):
//   1. Repair / drop Windows-1252 quote artefacts ('92t → 't, '93 → "")
//   2. Line breaks, tabs and non-breaking spaces become spaces
//   3. Markup characters {}@_*>()\#%+=[] are removed
//   4. Sentence punctuation . ! ? is followed by a space
//   5. Runs of spaces collapse into one, edges are trimmed
//
// Step 4 is what lets the segmenter split on ". " later.

/// Quote artefacts left behind by a bad cp1252 → UTF-8 conversion.
const ARTEFACTS: &[(&str, &str)] = &[
    ("'92t", "'t"),
    ("'92s", "'s"),
    ("'92m", "'m"),
    ("'92ll", "'ll"),
    ("'91", ""),
    ("'92", ""),
    ("'93", ""),
    ("'94", ""),
];

const MARKUP: &[char] = &['{', '}', '@', '_', '*', '>', '(', ')', '\\', '#', '%', '+', '=', '[', ']'];

pub struct Preprocessor;

impl Preprocessor {
    /// Create a new Preprocessor instance
    pub fn new() -> Self {
        Self
    }

    /// Clean a raw text string for vocabulary lookup.
    pub fn clean(&self, text: &str) -> String {
        // ── Step 1: quote artefacts ───────────────────────────────────────────
        let mut repaired = text.to_string();
        for (from, to) in ARTEFACTS {
            repaired = repaired.replace(from, to);
        }

        // ── Steps 2-5: single character pass ─────────────────────────────────
        let mut out        = String::with_capacity(repaired.len() + repaired.len() / 8);
        let mut last_space = false;

        for c in repaired.chars() {
            let c = match c {
                '\n' | '\r' | '\t' | '\u{00A0}' => ' ',
                c if MARKUP.contains(&c) => continue,
                c => c,
            };

            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
                continue;
            }

            out.push(c);
            last_space = false;

            if matches!(c, '.' | '!' | '?') {
                out.push(' ');
                last_space = true;
            }
        }

        out.trim().to_string()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// Layer 4 — Text Processor
// ============================================================
// Regex cleaning applied to every corpus line before training
// and to every predictor input before encoding.
//
// Rules (applied in order):
//   1. Drop "(...)" groups            non-greedy
//   2. Drop "[...]" groups            non-greedy
//   3. Drop "{...}" groups            non-greedy
//   4. Strip dots inside abbreviations   "u.s.a." → "usa"
//   5. Runs of : - / * & $ # @ ^ or ".." and longer → one space
//   6. Runs of , . ! ? ;  → padded with a space on each side
//   7. Delete = < > " ` ( ) [ ] { }
//   8. Delete a quote sitting between the classes [ ^] and [ $]
//
// Corpus files are cleaned in place. The untouched file is kept
// next to it as `<file>.origin`; a file that already has an
// `.origin` sibling is treated as cleaned and left alone.
//
// Reference: regex crate documentation (Regex::replace_all)

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// What a rule does with each match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rewrite {
    /// Remove the match
    Delete,
    /// Replace the match with a single space
    Space,
    /// Keep the match, surrounded by spaces
    Pad,
    /// Keep the match without its '.' characters
    StripDots,
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: Regex,
    rewrite: Rewrite,
}

impl Rule {
    fn apply(&self, text: &str) -> String {
        match self.rewrite {
            Rewrite::Delete    => self.pattern.replace_all(text, "").into_owned(),
            Rewrite::Space     => self.pattern.replace_all(text, " ").into_owned(),
            Rewrite::Pad       => self.pattern.replace_all(text, " ${0} ").into_owned(),
            Rewrite::StripDots => self
                .pattern
                .replace_all(text, |caps: &Captures| caps[0].replace('.', ""))
                .into_owned(),
        }
    }
}

const DEFAULT_RULES: [(&str, Rewrite); 8] = [
    (r"\(.*?\)",                 Rewrite::Delete),
    (r"\[.*?\]",                 Rewrite::Delete),
    (r"\{.*?\}",                 Rewrite::Delete),
    (r"\w+\.?\w\.+",             Rewrite::StripDots),
    (r"[:\-/*&$#@^]+|\.{2,}",    Rewrite::Space),
    (r"[,.!?;]+",                Rewrite::Pad),
    (r#"[=<>"`()\[\]{}]+"#,      Rewrite::Delete),
    (r"[ ^]'[ $]",               Rewrite::Delete),
];

#[derive(Debug, Clone)]
pub struct TextProcessor {
    rules: Vec<Rule>,
}

impl TextProcessor {
    /// Compile the default rule stack.
    pub fn new() -> Result<Self> {
        let mut tp = Self { rules: Vec::with_capacity(DEFAULT_RULES.len()) };
        for (pattern, rewrite) in DEFAULT_RULES {
            tp = tp.with_rule(pattern, rewrite)?;
        }
        Ok(tp)
    }

    /// Append a rule after the existing ones.
    pub fn with_rule(mut self, pattern: &str, rewrite: Rewrite) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .with_context(|| format!("Invalid cleaning pattern '{pattern}'"))?;
        self.rules.push(Rule { pattern, rewrite });
        Ok(self)
    }

    /// Run every rule over one line.
    pub fn clean(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc))
    }

    /// Clean a corpus file in place, keeping the original as `<path>.origin`.
    ///
    /// Returns `false` without touching anything when the `.origin`
    /// backup already exists.
    pub fn clean_file(&self, path: &Path) -> Result<bool> {
        let backup = origin_path(path);
        if backup.exists() {
            tracing::info!("'{}' already cleaned, skipping", path.display());
            return Ok(false);
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Cannot read corpus file '{}'", path.display()))?;

        let mut cleaned = String::with_capacity(raw.len());
        for line in raw.lines() {
            cleaned.push_str(&self.clean(line));
            cleaned.push('\n');
        }

        fs::rename(path, &backup)
            .with_context(|| format!("Cannot back up '{}'", path.display()))?;
        fs::write(path, cleaned)
            .with_context(|| format!("Cannot write cleaned '{}'", path.display()))?;

        tracing::info!("Cleaned '{}' ({} lines)", path.display(), raw.lines().count());
        Ok(true)
    }
}

/// `<path>.origin`
pub fn origin_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".origin");
    PathBuf::from(name)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn tp() -> TextProcessor {
        TextProcessor::new().unwrap()
    }

    #[test]
    fn test_drops_bracketed_groups() {
        assert_eq!(tp().clean("hi (aside) there"), "hi  there");
        assert_eq!(tp().clean("a [b] c {d} e"), "a  c  e");
    }

    #[test]
    fn test_strips_abbreviation_dots() {
        assert_eq!(tp().clean("usa"), "usa");
        assert_eq!(tp().clean("u.s."), "us");
    }

    #[test]
    fn test_punctuation_is_padded() {
        assert_eq!(tp().clean("hello,world!"), "hello , world ! ");
    }

    #[test]
    fn test_separators_become_spaces() {
        assert_eq!(tp().clean("a/b"), "a b");
        assert_eq!(tp().clean("a ... b"), "a   b");
    }

    #[test]
    fn test_quote_chars_removed() {
        assert_eq!(tp().clean("say \"yes\""), "say yes");
        assert_eq!(tp().clean("x ' y"), "xy");
    }

    #[test]
    fn test_extra_rule_runs_last() {
        let tp = tp().with_rule("x+", Rewrite::Delete).unwrap();
        assert_eq!(tp.clean("axxb"), "ab");
    }

    #[test]
    fn test_clean_file_keeps_origin_and_runs_once() {
        let dir = std::env::temp_dir().join(format!("tp_clean_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("enc.txt");
        fs::write(&path, "hi(there)\nok\n").unwrap();

        assert!(tp().clean_file(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "hi\nok\n");
        assert_eq!(fs::read_to_string(origin_path(&path)).unwrap(), "hi(there)\nok\n");

        // Second call is a no-op
        assert!(!tp().clean_file(&path).unwrap());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(tp().clean(""), "");
    }
}

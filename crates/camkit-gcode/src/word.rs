//! Words and lines
//!
//! A word is a code letter and a number. A line is an ordered list of words
//! with one optional line-level comment.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of decimal places
pub const DEFAULT_PRECISION: usize = 6;

/// Letter case used for code letters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterCase {
    #[default]
    Upper,
    Lower,
}

/// Formatting applied when a word is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordFormat {
    pub precision: usize,
    pub case: LetterCase,
}

impl Default for WordFormat {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            case: LetterCase::Upper,
        }
    }
}

/// Render a number at fixed precision, trimming trailing zeros and a bare decimal point
pub fn format_number(value: f64, precision: usize) -> String {
    let mut s = format!("{:.*}", precision, value);
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

/// Single G-code word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    code: char,
    value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

impl Word {
    pub fn new(code: char, value: f64) -> Self {
        Self {
            code: code.to_ascii_uppercase(),
            value,
            comment: None,
        }
    }

    /// Attach an inline `(comment)`
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn code(&self) -> char {
        self.code
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// True when code and value match, ignoring any comment
    pub fn is(&self, code: char, value: f64) -> bool {
        self.code == code.to_ascii_uppercase() && self.value == value
    }

    pub fn render(&self, format: &WordFormat) -> String {
        let letter = match format.case {
            LetterCase::Upper => self.code,
            LetterCase::Lower => self.code.to_ascii_lowercase(),
        };
        let mut out = format!("{}{}", letter, format_number(self.value, format.precision));
        if let Some(comment) = &self.comment {
            out.push_str(&format!(" ({})", comment));
        }
        out
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(&WordFormat::default()))
    }
}

/// Ordered words plus a line comment
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Line {
    pub words: Vec<Word>,
    pub comment: String,
}

impl Line {
    pub fn new(words: Vec<Word>) -> Self {
        Self {
            words,
            comment: String::new(),
        }
    }

    /// A line that carries only a comment
    pub fn comment_only(comment: impl Into<String>) -> Self {
        Self {
            words: Vec::new(),
            comment: comment.into(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn push(&mut self, word: Word) {
        self.words.push(word);
    }

    /// First word with the given letter
    pub fn find(&self, code: char) -> Option<&Word> {
        let code = code.to_ascii_uppercase();
        self.words.iter().find(|w| w.code == code)
    }

    pub fn render(&self, format: &WordFormat) -> String {
        let words: Vec<String> = self.words.iter().map(|w| w.render(format)).collect();
        let mut out = words.join(" ");
        if !self.comment.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str("; ");
            out.push_str(&self.comment);
        }
        out
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(&WordFormat::default()))
    }
}

//! Blocks and programs
//!
//! A [`Program`] is an ordered list of [`Block`]s, each a named run of
//! [`Line`]s together with the machine state captured when the block was
//! opened. Lines are only ever appended to the trailing block.

use crate::dialect;
use crate::word::{LetterCase, Line, Word, WordFormat, DEFAULT_PRECISION};
use camkit_core::MachineState;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Notification fired for every appended line with its words and comment
pub type LineCallback = Box<dyn FnMut(&[Word], &str) + Send>;

/// Line terminator used when rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// Program formatting options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramOptions {
    /// Prefix each line with a hierarchical `N` number
    pub line_numbers: bool,
    /// Decimal places per number
    pub precision: usize,
    pub case: LetterCase,
    pub line_ending: LineEnding,
    /// Word emitted on the final line, `None` to omit it
    pub stop_code: Option<Word>,
}

impl Default for ProgramOptions {
    fn default() -> Self {
        Self {
            line_numbers: false,
            precision: DEFAULT_PRECISION,
            case: LetterCase::Upper,
            line_ending: LineEnding::Lf,
            stop_code: Some(dialect::program_end_word()),
        }
    }
}

impl ProgramOptions {
    pub fn word_format(&self) -> WordFormat {
        WordFormat {
            precision: self.precision,
            case: self.case,
        }
    }
}

/// Named section of a program
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    /// Empty for unnamed blocks
    pub name: String,
    /// State at the moment the block was opened
    pub state: MachineState,
    pub lines: Vec<Line>,
}

impl Block {
    pub fn new(name: impl Into<String>, state: MachineState) -> Self {
        Self {
            name: name.into(),
            state,
            lines: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Render without line numbers; empty blocks render as nothing
    pub fn render(&self, options: &ProgramOptions) -> String {
        let mut out = String::new();
        self.render_into(&mut out, options, None);
        out
    }

    /// `number` is the block's ordinal and the numbering stride
    fn render_into(
        &self,
        out: &mut String,
        options: &ProgramOptions,
        number: Option<(usize, usize)>,
    ) {
        if self.is_empty() {
            return;
        }
        let eol = options.line_ending.as_str();
        let format = options.word_format();
        if !self.name.is_empty() {
            out.push_str("; ");
            out.push_str(&self.name);
            out.push_str(eol);
        }
        for (i, line) in self.lines.iter().enumerate() {
            if let Some((block_number, stride)) = number {
                out.push_str(&format!("N{} ", block_number * stride + i + 1));
            }
            out.push_str(&line.render(&format));
            out.push_str(eol);
        }
    }
}

/// Complete G-code program
#[derive(Default)]
pub struct Program {
    blocks: Vec<Block>,
    options: ProgramOptions,
    callback: Option<LineCallback>,
}

impl Program {
    pub fn new(options: ProgramOptions) -> Self {
        Self {
            blocks: Vec::new(),
            options,
            callback: None,
        }
    }

    pub fn options(&self) -> &ProgramOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: ProgramOptions) {
        self.options = options;
    }

    /// Install or clear the per-line notification
    pub fn set_callback(&mut self, callback: Option<LineCallback>) {
        self.callback = callback;
    }

    /// Open a block; an empty trailing block is renamed and re-captured instead
    pub fn new_block(&mut self, name: impl Into<String>, state: MachineState) {
        let name = name.into();
        match self.blocks.last_mut() {
            Some(last) if last.is_empty() => {
                last.name = name;
                last.state = state;
            }
            _ => self.blocks.push(Block::new(name, state)),
        }
    }

    /// Append to the trailing block, creating an unnamed one if needed
    pub fn add_line(&mut self, line: Line) {
        if self.blocks.is_empty() {
            self.blocks.push(Block::default());
        }
        trace!(line = %line, "emit");
        if let Some(callback) = self.callback.as_mut() {
            callback(&line.words, &line.comment);
        }
        if let Some(block) = self.blocks.last_mut() {
            block.lines.push(line);
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn current_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Total number of lines across all blocks
    pub fn line_count(&self) -> usize {
        self.blocks.iter().map(|b| b.lines.len()).sum()
    }

    /// Every line in order
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.blocks.iter().flat_map(|b| b.lines.iter())
    }

    /// Multiplier for hierarchical line numbers
    ///
    /// 1000 unless a block holds 1000 lines or more, in which case the next
    /// power of ten above the longest block keeps numbers unique.
    pub fn number_stride(&self) -> usize {
        let longest = self.blocks.iter().map(|b| b.lines.len()).max().unwrap_or(0);
        let mut stride = 1000;
        while stride <= longest {
            stride *= 10;
        }
        stride
    }

    pub fn render(&self) -> String {
        let eol = self.options.line_ending.as_str();
        let stride = self.number_stride();
        let mut out = String::new();
        let mut rendered = 0;
        for block in self.blocks.iter().filter(|b| !b.is_empty()) {
            if rendered > 0 {
                out.push_str(eol);
            }
            rendered += 1;
            let number = self.options.line_numbers.then_some((rendered, stride));
            block.render_into(&mut out, &self.options, number);
        }
        if let Some(stop) = &self.options.stop_code {
            if rendered > 0 {
                out.push_str(eol);
            }
            if self.options.line_numbers {
                out.push_str(&format!("N{} ", (rendered + 1) * stride + 1));
            }
            out.push_str(&stop.render(&self.options.word_format()));
            out.push_str(eol);
        }
        out
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("blocks", &self.blocks)
            .field("options", &self.options)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

//! # CamKit G-code
//!
//! Program model for emitted G-code: words compose into lines, lines into
//! named blocks, blocks into a program. The [`dialect`] module maps modal
//! values to their words.

pub mod dialect;
pub mod program;
pub mod word;

pub use program::{Block, LineCallback, LineEnding, Program, ProgramOptions};
pub use word::{format_number, LetterCase, Line, Word, WordFormat, DEFAULT_PRECISION};

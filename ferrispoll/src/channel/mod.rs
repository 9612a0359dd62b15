//! Channel layer: output accumulation and response completion.
//!
//! This module turns the raw byte stream of an interactive terminal into
//! escape-free transcripts, and decides when a command's response is done.

mod buffer;
mod settle;

pub use buffer::TranscriptBuffer;
pub use settle::{Completion, SettleMode, SettleTime, drain};

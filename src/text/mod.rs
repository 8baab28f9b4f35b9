//! Text assembly
//!
//! Turns canonical documents into the flat text the search store indexes,
//! plus the [`OffsetIndex`] that maps character ranges back to word boxes.

mod assembler;
mod escape;

pub use assembler::{assemble, OffsetEntry, OffsetIndex, OffsetIndexError, WORD_SEPARATOR};
pub use escape::{decode_escape, escape_non_ascii, is_printable_ascii, maybe_escape, push_escaped};

//! Error taxonomy and result-flag aggregation.
//!
//! Fatal kinds abort `open` outright and are modeled as a [`CodecError`]
//! variant returned in a `Result::Err`. Non-fatal conditions (more channels
//! than are individually named, silent segments, unsupported-but-ignorable
//! chunks) do not abort anything; they accumulate into a [`ResultFlags`]
//! bitset returned alongside the successfully opened file.

use bitflags::bitflags;
use thiserror::Error;

/// Fatal open/parse/validate failures. Any one of these aborts `open`.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("could not open file")]
    FileCantOpen(#[from] std::io::Error),

    #[error("not a RIFF/WAVE file")]
    NotWave,

    #[error("RIFF size field ({declared}) does not match on-disk size minus 8 ({actual})")]
    BadSize { declared: u64, actual: u64 },

    #[error("malformed WAVE chunk structure: {0}")]
    BadWave(String),

    #[error("unsupported or invalid format chunk: {0}")]
    BadFormat(String),

    #[error("invalid sample rate (zero)")]
    BadFrequency,

    #[error("invalid or unsupported bit depth: {0} bits")]
    BadBitDepth(u16),

    #[error("fewer than two decodable samples in waveform")]
    BadSamples,
}

bitflags! {
    /// Non-fatal warning flags accumulated while scanning a WAVE file.
    ///
    /// `FILE_READ_SUCCESS` is the empty set, matching the source's
    /// "zero means success" convention; it exists so call sites can name it
    /// explicitly instead of writing `ResultFlags::empty()`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResultFlags: u32 {
        const FILE_READ_SUCCESS = 0;
        /// More channels present than [`crate::config::MAX_NAMED_CHANNELS`].
        const CHAN_WARNING = 1 << 0;
        /// `slnt` silent segments, or `plst`/`smpl` chunks, were encountered.
        const CHUNK_WARNING = 1 << 1;
    }
}

impl Default for ResultFlags {
    fn default() -> Self {
        ResultFlags::FILE_READ_SUCCESS
    }
}

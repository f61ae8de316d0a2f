//! The RIFF/WAVE container codec: chunk scanning, `fmt ` validation,
//! waveform segment discovery, and PCM decode/encode with dither.

pub mod chunk;
pub mod codec;
pub mod format;

pub use chunk::{ChunkLocation, ChunkTable, RiffHeader};
pub use codec::SegmentDescriptor;
pub use format::{SampleLayout, WaveFormat};

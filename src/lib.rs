//! Frequency-domain editor for PCM WAVE files: a RIFF/WAVE codec, a chunked
//! sample container, a real-valued FFT engine, and a Tukey-windowed
//! spectral edit operator with undo/redo history.

pub mod config;
pub mod edit;
pub mod error;
pub mod fft;
pub mod numeric;
pub mod riff;
pub mod segment;
pub mod sort;
pub mod wave_file;

pub use edit::{ChangeType, History};
pub use error::{CodecError, ResultFlags};
pub use riff::{SampleLayout, WaveFormat};
pub use segment::Samples;
pub use wave_file::WaveFile;

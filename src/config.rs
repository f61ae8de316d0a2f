//! Design constants named by the component design: the segment cap for the
//! chunked sample container, the number of channels given standard speaker
//! names, the RIFF chunk-scan iteration cap, and the decode/encode buffer
//! target size.

/// Maximum number of samples held in one physical segment of a
/// [`crate::segment::SegmentedFunction`]. A fixed power of two so that the
/// `(i / cap, i % cap)` index split stays cheap.
pub const SEGMENT_CAP: usize = 16 * 1024 * 1024; // 16 * 2^20

/// Channels beyond this index are still decoded and edited, but are not
/// individually named (see [`crate::riff::format::channel_name`]) and raise
/// `CHAN_WARNING` at open.
pub const MAX_NAMED_CHANNELS: usize = 18;

/// Hard cap on RIFF chunk-scan iterations; guards against pathological or
/// truncated files whose chunk sizes never reach the declared end.
pub const SCAN_ITERATION_CAP: u32 = 1 << 16;

/// Target size, in bytes, of one buffered decode/encode block. The actual
/// buffer size used is this value rounded down to a whole multiple of the
/// format's block alignment.
pub const DECODE_BUFFER_TARGET: usize = 16 * 1024 * 1024;

/// Explicit dither RNG seed, threaded into the encoder by the caller rather
/// than drawn from thread-local or global state, so a test can reproduce an
/// exact quantized byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DitherSeed(pub u64);

impl Default for DitherSeed {
    fn default() -> Self {
        DitherSeed(0x5EED_D17E)
    }
}

//! The public facade: ties the RIFF/WAVE codec, the segmented sample
//! containers, the FFT engine, and the edit history into one file-scoped
//! object. Channels are held in the frequency domain at rest; the codec's
//! time domain is only ever materialized transiently, during decode (on
//! open) and encode (on save).

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::instrument;

use crate::config::{DitherSeed, MAX_NAMED_CHANNELS};
use crate::edit::{ChangeType, History};
use crate::error::{CodecError, ResultFlags};
use crate::fft;
use crate::numeric::next_power_of_two;
use crate::riff::chunk::{self, ChunkLocation};
use crate::riff::codec;
use crate::riff::format::{self, SampleLayout, WaveFormat};
use crate::segment::{SegmentedFunction, Samples};

/// An open (or newly created, unsaved) WAVE file: format, waveform layout,
/// frequency-domain per-channel samples, and the modification history.
pub struct WaveFile {
    path: Option<PathBuf>,
    fh: Option<File>,
    format: WaveFormat,
    waveform: ChunkLocation,
    descriptors: Vec<codec::SegmentDescriptor>,
    sample_length: u64,
    channels: Vec<Samples>,
    history: History,
    dither_seed: DitherSeed,
}

impl WaveFile {
    /// Opens and fully decodes the WAVE file at `path`, transforming every
    /// editable channel into the frequency domain.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<(WaveFile, ResultFlags), CodecError> {
        let path = path.as_ref();
        let mut fh = codec::open_read_write(path)?;
        let header = chunk::read_riff_header(&mut fh)?;
        let total = chunk::validate_riff_size(&mut fh, header.declared_size)?;
        let table = chunk::scan_chunks(&mut fh, total)?;
        let mut warnings = table.warnings;

        let mut fmt_payload = vec![0u8; table.fmt_chunk.payload_size as usize];
        fh.seek(SeekFrom::Start(table.fmt_chunk.payload_offset))?;
        fh.read_exact(&mut fmt_payload)?;
        let format = format::parse_fmt_payload(&fmt_payload)?;
        if format.channels as usize > MAX_NAMED_CHANNELS {
            warnings |= ResultFlags::CHAN_WARNING;
        }

        let (descriptors, segment_warnings) =
            codec::discover_waveform_segments(&mut fh, &table.waveform_chunk)?;
        warnings |= segment_warnings;
        let sample_length = codec::derive_sample_length(&descriptors, format.block_align)?;

        let mut channels = codec::decode_channels(
            &mut fh,
            &format,
            &table.waveform_chunk,
            &descriptors,
            sample_length,
        )?;
        for samples in channels.iter_mut() {
            transform_forward(samples);
        }

        let wave_file = WaveFile {
            path: Some(path.to_path_buf()),
            fh: Some(fh),
            format,
            waveform: table.waveform_chunk,
            descriptors,
            sample_length,
            channels,
            history: History::new(),
            dither_seed: DitherSeed::default(),
        };
        Ok((wave_file, warnings))
    }

    /// Builds an in-memory, silent, single-channel (mono, front-center) new
    /// file; nothing is written to disk until [`Self::save_as`] is called.
    pub fn new_file(seconds: f64, sample_rate: u32, byte_depth: u16) -> Result<WaveFile, CodecError> {
        if sample_rate == 0 {
            return Err(CodecError::BadFrequency);
        }
        if !(1..=4).contains(&byte_depth) {
            return Err(CodecError::BadBitDepth(byte_depth * 8));
        }
        let format = WaveFormat {
            channels: 1,
            sample_rate,
            bits_per_sample: byte_depth * 8,
            byte_depth,
            block_align: byte_depth,
            channel_mask: 0x4, // SPEAKER_FRONT_CENTER
        };
        let sample_length = ((seconds * sample_rate as f64).round() as u64).max(2);
        let padded_length = next_power_of_two(sample_length as usize) as u64;
        let container_len = (padded_length / 2).max(1) as usize;

        let mut samples = match format.layout() {
            SampleLayout::Single => Samples::Single(SegmentedFunction::new(container_len)),
            SampleLayout::Double => Samples::Double(SegmentedFunction::new(container_len)),
        };
        let silence = codec::pad_value(byte_depth);
        for i in 0..padded_length {
            codec::write_real(&mut samples, i, silence);
        }
        transform_forward(&mut samples);

        Ok(WaveFile {
            path: None,
            fh: None,
            format,
            waveform: ChunkLocation {
                payload_offset: 0,
                payload_size: 0,
                is_list: false,
            },
            descriptors: Vec::new(),
            sample_length,
            channels: vec![samples],
            history: History::new(),
            dither_seed: DitherSeed::default(),
        })
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel_name(&self, index: u16) -> String {
        self.format.channel_name(index)
    }

    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    pub fn sample_length(&self) -> u64 {
        self.sample_length
    }

    /// The power-of-two real-domain sample count every editable channel was
    /// padded to on load (or at creation, for a brand new file).
    pub fn sample_layout(&self) -> SampleLayout {
        self.format.layout()
    }

    pub fn padded_sample_length(&self) -> u64 {
        self.channels.first().map(|s| s.len() as u64 * 2).unwrap_or(0)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    #[cfg(test)]
    pub(crate) fn channels(&self) -> &[Samples] {
        &self.channels
    }

    /// Applies a Tukey-windowed magnitude edit to `channel`'s spectrum over
    /// `[from, to]`, recording it in the undo/redo history.
    #[instrument(skip(self), fields(channel, from, to))]
    pub fn apply(
        &mut self,
        channel: usize,
        from: u64,
        to: u64,
        change_type: ChangeType,
        change_amount: f64,
        smoothing: f64,
    ) -> bool {
        self.history.apply(
            &mut self.channels,
            channel,
            from as usize,
            to as usize,
            change_type,
            change_amount,
            smoothing,
        )
    }

    #[instrument(skip(self))]
    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.channels)
    }

    #[instrument(skip(self))]
    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.channels)
    }

    /// Saves back to the path this file was opened from (or last saved to).
    pub fn save(&mut self) -> Result<(), CodecError> {
        let path = self.path.clone().ok_or_else(|| {
            CodecError::FileCantOpen(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "file has no destination path yet; call save_as",
            ))
        })?;
        self.save_as(&path)
    }

    /// Saves to `dest`. If `dest` is the path this file is already backed
    /// by, rewrites in place; otherwise copies the source (or, for a file
    /// created via [`Self::new_file`], allocates a fresh zero-filled
    /// waveform) before rewriting. On failure, a destination this call
    /// created or copied is unlinked; an in-place rewrite of a pre-existing
    /// path is left as-is, since unlinking would only discard the original.
    #[instrument(skip(self, dest), fields(dest = %dest.as_ref().display()))]
    pub fn save_as(&mut self, dest: impl AsRef<Path>) -> Result<(), CodecError> {
        let dest = dest.as_ref();
        let same_path = self.path.as_deref() == Some(dest);
        let we_created_dest = !same_path;

        let result = self.save_as_inner(dest, same_path);
        if result.is_err() && we_created_dest {
            let _ = std::fs::remove_file(dest);
        }
        result
    }

    fn save_as_inner(&mut self, dest: &Path, same_path: bool) -> Result<(), CodecError> {
        if !same_path {
            match &self.path {
                Some(src) => codec::copy_file(src, dest)?,
                None => {
                    codec::create_new_file(dest, &self.format, self.sample_length)?;
                }
            }
        }

        let mut fh = codec::open_read_write(dest)?;
        let header = chunk::read_riff_header(&mut fh)?;
        let total = chunk::validate_riff_size(&mut fh, header.declared_size)?;
        let table = chunk::scan_chunks(&mut fh, total)?;
        let (descriptors, _warnings) = codec::discover_waveform_segments(&mut fh, &table.waveform_chunk)?;

        let time_domain: Vec<Samples> = self.channels.iter().map(transform_inverse).collect();
        codec::encode_channels(
            &mut fh,
            &self.format,
            &table.waveform_chunk,
            &descriptors,
            &time_domain,
            self.sample_length,
            self.dither_seed,
        )?;

        self.path = Some(dest.to_path_buf());
        self.waveform = table.waveform_chunk;
        self.descriptors = descriptors;
        self.fh = Some(fh);
        Ok(())
    }
}

fn transform_forward(samples: &mut Samples) {
    match samples {
        Samples::Single(buf) => {
            let mut data = buf.to_contiguous();
            fft::real_fft_inplace(&mut data);
            buf.load_contiguous(&data);
        }
        Samples::Double(buf) => {
            let mut data = buf.to_contiguous();
            fft::real_fft_inplace(&mut data);
            buf.load_contiguous(&data);
        }
    }
}

/// Returns a time-domain copy of `samples` without mutating it; edits,
/// undo, and redo all operate on the frequency-domain original.
fn transform_inverse(samples: &Samples) -> Samples {
    match samples {
        Samples::Single(buf) => {
            let mut data = buf.to_contiguous();
            fft::inverse_real_fft_inplace(&mut data);
            let mut out = SegmentedFunction::with_segment_cap(data.len(), buf.segment_len().max(1));
            out.load_contiguous(&data);
            Samples::Single(out)
        }
        Samples::Double(buf) => {
            let mut data = buf.to_contiguous();
            fft::inverse_real_fft_inplace(&mut data);
            let mut out = SegmentedFunction::with_segment_cap(data.len(), buf.segment_len().max(1));
            out.load_contiguous(&data);
            Samples::Double(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_chunk(buf: &mut Vec<u8>, id: &[u8; 4], payload: &[u8]) {
        buf.extend_from_slice(id);
        buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            buf.push(0);
        }
    }

    fn pcm_fmt_payload(channels: u16, sample_rate: u32, bits_per_sample: u16) -> Vec<u8> {
        let block_align = (bits_per_sample as u32 * channels as u32) / 8;
        let bytes_per_sec = block_align * sample_rate;
        let mut v = Vec::new();
        v.extend_from_slice(&1u16.to_le_bytes());
        v.extend_from_slice(&channels.to_le_bytes());
        v.extend_from_slice(&sample_rate.to_le_bytes());
        v.extend_from_slice(&bytes_per_sec.to_le_bytes());
        v.extend_from_slice(&(block_align as u16).to_le_bytes());
        v.extend_from_slice(&bits_per_sample.to_le_bytes());
        v
    }

    fn build_wave(fmt_payload: &[u8], data_payload: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        write_chunk(&mut body, b"fmt ", fmt_payload);
        write_chunk(&mut body, b"data", data_payload);
        let mut file = Vec::new();
        file.extend_from_slice(b"RIFF");
        file.extend_from_slice(&((4 + body.len()) as u32).to_le_bytes());
        file.extend_from_slice(b"WAVE");
        file.extend_from_slice(&body);
        file
    }

    fn write_temp(bytes: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn opens_16bit_mono_8192_samples() {
        let fmt = pcm_fmt_payload(1, 44100, 16);
        let data = vec![0u8; 8192 * 2];
        let temp = write_temp(&build_wave(&fmt, &data));

        let (wave, warnings) = WaveFile::open(temp.path()).unwrap();
        assert_eq!(wave.channel_count(), 1);
        assert_eq!(wave.padded_sample_length(), 8192);
        assert_eq!(warnings, ResultFlags::FILE_READ_SUCCESS);
    }

    #[test]
    fn opens_24bit_stereo_10000_samples_pads_to_16384() {
        let fmt = pcm_fmt_payload(2, 48000, 24);
        let data = vec![0u8; 10000 * 6]; // block_align = 6
        let temp = write_temp(&build_wave(&fmt, &data));

        let (wave, _) = WaveFile::open(temp.path()).unwrap();
        assert_eq!(wave.sample_length(), 10000);
        assert_eq!(wave.padded_sample_length(), 16384);
        assert_eq!(wave.channel_count(), 2);
        for s in wave.channels() {
            assert!(!s.is_single());
        }
    }

    #[test]
    fn bad_size_reports_error_and_leaves_no_temp_resources() {
        let fmt = pcm_fmt_payload(1, 44100, 16);
        let mut bytes = build_wave(&fmt, &vec![0u8; 16]);
        let wrong = (bytes.len() - 8 + 1) as u32;
        bytes[4..8].copy_from_slice(&wrong.to_le_bytes());
        let temp = write_temp(&bytes);

        let err = WaveFile::open(temp.path()).unwrap_err();
        assert!(matches!(err, CodecError::BadSize { .. }));
    }

    #[test]
    fn new_file_then_save_as_round_trips_silence() {
        let mut wave = WaveFile::new_file(0.01, 8000, 2).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.wav");
        wave.save_as(&dest).unwrap();

        let (reopened, _) = WaveFile::open(&dest).unwrap();
        assert_eq!(reopened.channel_count(), 1);
        assert_eq!(reopened.sample_rate(), 8000);
    }

    #[test]
    fn multiply_by_zero_then_save_quantizes_to_silence() {
        let fmt = pcm_fmt_payload(1, 8000, 16);
        let data: Vec<u8> = (0..256u32)
            .flat_map(|i| ((i as i16 * 37) % 1000).to_le_bytes())
            .collect();
        let temp = write_temp(&build_wave(&fmt, &data));
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work.wav");
        std::fs::copy(temp.path(), &work).unwrap();

        let (mut wave, _) = WaveFile::open(&work).unwrap();
        let last = wave.padded_sample_length() / 2 - 1;
        assert!(wave.apply(0, 0, last, ChangeType::Multiplicative, 0.0, 0.0));
        wave.save().unwrap();

        let mut fh = File::open(&work).unwrap();
        let mut all = Vec::new();
        fh.read_to_end(&mut all).unwrap();
        let data_start = all.len() - 256 * 2;
        for chunk in all[data_start..].chunks_exact(2) {
            let v = i16::from_le_bytes([chunk[0], chunk[1]]);
            assert!(v.abs() <= 1, "expected near-zero sample, got {v}");
        }
    }
}

//! Waveform segment discovery, PCM decode/encode with dither, and the
//! new-file / save-as file operations. Builds on [`super::chunk`] (header
//! scanning) and [`super::format`] (fmt validation).

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use num_complex::Complex;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use tracing::{info, instrument};

use crate::config::{DECODE_BUFFER_TARGET, DitherSeed, MAX_NAMED_CHANNELS, SCAN_ITERATION_CAP};
use crate::error::{CodecError, ResultFlags};
use crate::numeric::next_power_of_two;
use crate::segment::{Complex32, Complex64, SegmentedFunction, Samples};
use crate::sort::quicksort;

use super::chunk::{self, ChunkLocation, DATA_ID, SLNT_ID};
use super::format::{SampleLayout, WaveFormat};

/// One sub-chunk of the waveform region: either a `data` or `slnt` segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentDescriptor {
    pub id: [u8; 4],
    pub size: u32,
    pub relative_offset: u64,
}

/// Builds the ordered segment descriptor array for a located waveform
/// chunk. For the single-`data` form this is a one-element array; for a
/// `wavl` `LIST` it iterates sub-chunks within the declared region.
pub fn discover_waveform_segments(
    fh: &mut File,
    waveform: &ChunkLocation,
) -> Result<(Vec<SegmentDescriptor>, ResultFlags), CodecError> {
    if !waveform.is_list {
        return Ok((
            vec![SegmentDescriptor {
                id: *DATA_ID,
                size: waveform.payload_size,
                relative_offset: 0,
            }],
            ResultFlags::default(),
        ));
    }

    let mut descriptors = Vec::new();
    let mut warnings = ResultFlags::default();
    let region_len = waveform.payload_size as u64;
    let mut consumed: u64 = 0;

    for _ in 0..SCAN_ITERATION_CAP {
        if consumed >= region_len {
            break;
        }
        if consumed + 8 > region_len {
            return Err(CodecError::BadWave("wavl sub-chunk header runs past list end".into()));
        }
        fh.seek(SeekFrom::Start(waveform.payload_offset + consumed))?;
        let mut id = [0u8; 4];
        fh.read_exact(&mut id)?;
        let size = fh.read_u32::<LittleEndian>()?;
        if &id != DATA_ID && &id != SLNT_ID {
            return Err(CodecError::BadWave("unexpected sub-chunk id in wavl list".into()));
        }
        if &id == SLNT_ID {
            warnings |= ResultFlags::CHUNK_WARNING;
        }
        descriptors.push(SegmentDescriptor {
            id,
            size,
            relative_offset: consumed + 8,
        });
        let padded = size as u64 + (size as u64 % 2);
        consumed += 8 + padded;
    }

    if consumed != region_len {
        return Err(CodecError::BadWave("wavl list size did not match declared length".into()));
    }
    if descriptors.is_empty() {
        return Err(CodecError::BadWave("wavl list has no segments".into()));
    }

    quicksort(&mut descriptors, &|a: &SegmentDescriptor, b: &SegmentDescriptor| {
        a.relative_offset < b.relative_offset
    });
    Ok((descriptors, warnings))
}

/// Sums the byte size of every `data`-id segment and divides by
/// `block_align` to recover the per-channel sample count.
pub fn derive_sample_length(descriptors: &[SegmentDescriptor], block_align: u16) -> Result<u64, CodecError> {
    let total_bytes: u64 = descriptors
        .iter()
        .filter(|d| &d.id == DATA_ID)
        .map(|d| d.size as u64)
        .sum();
    let sample_length = total_bytes / block_align.max(1) as u64;
    if sample_length < 2 {
        return Err(CodecError::BadSamples);
    }
    Ok(sample_length)
}

fn depth_max(byte_depth: u16) -> f64 {
    ((1i64 << (8 * byte_depth as i64 - 1)) - 1) as f64
}

/// The real value a literal on-disk zero decodes to at `byte_depth`; also
/// the fill value for samples padded past the on-disk sample count.
pub(crate) fn pad_value(byte_depth: u16) -> f64 {
    0.5 / (depth_max(byte_depth) + 0.5)
}

fn decode_int(bytes: &[u8], byte_depth: u16) -> i32 {
    match byte_depth {
        1 => bytes[0] as i32 - 128,
        2 => i16::from_le_bytes([bytes[0], bytes[1]]) as i32,
        3 => {
            let mut v = (bytes[0] as i32) | ((bytes[1] as i32) << 8) | ((bytes[2] as i32) << 16);
            if bytes[2] & 0x80 != 0 {
                v |= -1i32 << 24;
            }
            v
        }
        4 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        other => unreachable!("unsupported byte depth {other}"),
    }
}

fn encode_int(value: i32, byte_depth: u16, out: &mut [u8]) {
    match byte_depth {
        1 => out[0] = (value + 128) as u8,
        2 => out[..2].copy_from_slice(&(value as i16).to_le_bytes()),
        3 => {
            let bytes = value.to_le_bytes();
            out[..3].copy_from_slice(&bytes[..3]);
        }
        4 => out[..4].copy_from_slice(&value.to_le_bytes()),
        other => unreachable!("unsupported byte depth {other}"),
    }
}

fn decode_real(raw: i32, byte_depth: u16) -> f64 {
    (raw as f64 + 0.5) / (depth_max(byte_depth) + 0.5)
}

fn encode_real(sample: f64, byte_depth: u16, rng: &mut StdRng) -> i32 {
    let max = depth_max(byte_depth);
    let min = -(max + 1.0);
    let xi1: f64 = rng.gen_range(-1.0..0.0);
    let xi2: f64 = rng.gen_range(0.0..1.0);
    let dithered = (max * sample - 0.5 + xi1 + xi2).clamp(min, max);
    dithered.round() as i32
}

/// Number of channels actually decoded into [`Samples`] containers: the
/// file may declare more, which are preserved byte-for-byte on save but
/// never materialized as editable channels.
pub fn editable_channel_count(format: &WaveFormat) -> usize {
    (format.channels as usize).min(MAX_NAMED_CHANNELS)
}

/// Decodes PCM samples for every editable channel into normalized,
/// real-interleaved, power-of-two-length containers, per the layout
/// `format` selects.
#[instrument(skip(fh, descriptors), fields(channels = format.channels, sample_length))]
pub fn decode_channels(
    fh: &mut File,
    format: &WaveFormat,
    waveform: &ChunkLocation,
    descriptors: &[SegmentDescriptor],
    sample_length: u64,
) -> Result<Vec<Samples>, CodecError> {
    let editable = editable_channel_count(format);
    let padded_length = next_power_of_two(sample_length as usize) as u64;
    let container_len = (padded_length / 2).max(1) as usize;

    let mut channels: Vec<Samples> = (0..editable)
        .map(|_| match format.layout() {
            SampleLayout::Single => Samples::Single(SegmentedFunction::new(container_len)),
            SampleLayout::Double => Samples::Double(SegmentedFunction::new(container_len)),
        })
        .collect();

    let byte_depth = format.byte_depth;
    let block_align = format.block_align as u64;
    let frames_per_block = (DECODE_BUFFER_TARGET as u64 / block_align).max(1);

    let mut real_index: u64 = 0;
    for descriptor in descriptors.iter().filter(|d| &d.id == DATA_ID) {
        let absolute_offset = waveform.payload_offset + descriptor.relative_offset;
        let mut remaining = descriptor.size as u64;
        let mut pos = absolute_offset;
        let mut frame_buf = vec![0u8; (frames_per_block * block_align) as usize];

        while remaining > 0 {
            let frames_this_block = frames_per_block.min(remaining / block_align).max(1);
            let bytes_this_block = (frames_this_block * block_align) as usize;
            fh.seek(SeekFrom::Start(pos))?;
            fh.read_exact(&mut frame_buf[..bytes_this_block])?;

            for frame in 0..frames_this_block {
                let frame_base = (frame * block_align) as usize;
                for (c, container) in channels.iter_mut().enumerate() {
                    let slot = frame_base + c * byte_depth as usize;
                    let raw = decode_int(&frame_buf[slot..slot + byte_depth as usize], byte_depth);
                    let value = decode_real(raw, byte_depth);
                    write_real(container, real_index, value);
                }
                real_index += 1;
            }

            pos += bytes_this_block as u64;
            remaining -= bytes_this_block as u64;
        }
    }

    let pad = pad_value(byte_depth);
    for i in real_index..padded_length {
        for container in channels.iter_mut() {
            write_real(container, i, pad);
        }
    }

    info!(sample_length, padded_length, editable, "decoded waveform");
    Ok(channels)
}

pub(crate) fn write_real(samples: &mut Samples, real_index: u64, value: f64) {
    let slot = (real_index / 2) as usize;
    let is_imag = real_index % 2 == 1;
    match samples {
        Samples::Single(buf) => {
            let mut z = buf.get(slot);
            if is_imag {
                z.im = value as f32;
            } else {
                z.re = value as f32;
            }
            buf.set(slot, z);
        }
        Samples::Double(buf) => {
            let mut z = buf.get(slot);
            if is_imag {
                z.im = value;
            } else {
                z.re = value;
            }
            buf.set(slot, z);
        }
    }
}

pub(crate) fn read_real(samples: &Samples, real_index: u64) -> f64 {
    let slot = (real_index / 2) as usize;
    let is_imag = real_index % 2 == 1;
    match samples {
        Samples::Single(buf) => {
            let z: Complex32 = buf.get(slot);
            if is_imag { z.im as f64 } else { z.re as f64 }
        }
        Samples::Double(buf) => {
            let z: Complex64 = buf.get(slot);
            if is_imag { z.im } else { z.re }
        }
    }
}

/// Quantizes and dithers time-domain `channels` back into PCM, writing only
/// into the editable channel lanes of the destination's data segments and
/// leaving `slnt` segments and channels beyond [`MAX_NAMED_CHANNELS`]
/// untouched. `fh` must already contain a fully-formed (correctly sized)
/// waveform region, as produced by [`create_new_file`] or a prior copy.
#[instrument(skip(fh, descriptors, channels, seed))]
pub fn encode_channels(
    fh: &mut File,
    format: &WaveFormat,
    waveform: &ChunkLocation,
    descriptors: &[SegmentDescriptor],
    channels: &[Samples],
    sample_length: u64,
    seed: DitherSeed,
) -> Result<(), CodecError> {
    let byte_depth = format.byte_depth;
    let block_align = format.block_align as u64;
    let frames_per_block = (DECODE_BUFFER_TARGET as u64 / block_align).max(1);
    let mut rng = StdRng::seed_from_u64(seed.0);

    let mut real_index: u64 = 0;
    for descriptor in descriptors.iter().filter(|d| &d.id == DATA_ID) {
        let absolute_offset = waveform.payload_offset + descriptor.relative_offset;
        let mut remaining = (descriptor.size as u64).min((sample_length.saturating_sub(real_index)) * block_align);
        let mut pos = absolute_offset;

        while remaining > 0 && real_index < sample_length {
            let frames_this_block = frames_per_block.min(remaining / block_align).max(1);
            let bytes_this_block = (frames_this_block * block_align) as usize;
            let mut frame_buf = vec![0u8; bytes_this_block];

            // Read back the existing block first so channels beyond the
            // editable set (and any future codec additions) round-trip
            // untouched.
            fh.seek(SeekFrom::Start(pos))?;
            fh.read_exact(&mut frame_buf)?;

            for frame in 0..frames_this_block {
                if real_index >= sample_length {
                    break;
                }
                let frame_base = (frame * block_align) as usize;
                for (c, container) in channels.iter().enumerate() {
                    let value = read_real(container, real_index);
                    let raw = encode_real(value, byte_depth, &mut rng);
                    let slot = frame_base + c * byte_depth as usize;
                    encode_int(raw, byte_depth, &mut frame_buf[slot..slot + byte_depth as usize]);
                }
                real_index += 1;
            }

            fh.seek(SeekFrom::Start(pos))?;
            fh.write_all(&frame_buf)?;

            pos += bytes_this_block as u64;
            remaining = remaining.saturating_sub(bytes_this_block as u64);
        }
    }

    Ok(())
}

/// Writes a brand-new RIFF/WAVE file at `path`: RIFF header, `fmt ` chunk,
/// a single `data` chunk of `frame_count * block_align` bytes, zero-filled,
/// with a trailing pad byte if that length is odd.
pub fn create_new_file(
    path: &Path,
    format: &WaveFormat,
    frame_count: u64,
) -> Result<(), CodecError> {
    let data_len = frame_count * format.block_align as u64;
    let pad = data_len % 2;
    let fmt_payload_len: u32 = 40; // always written as WAVEFORMATEXTENSIBLE
    let riff_size = 4 + (8 + fmt_payload_len as u64) + (8 + data_len + pad);

    let mut file = File::create(path)?;
    file.write_all(chunk::RIFF_ID)?;
    file.write_all(&(riff_size as u32).to_le_bytes())?;
    file.write_all(chunk::WAVE_ID)?;

    file.write_all(chunk::FMT_ID)?;
    file.write_all(&fmt_payload_len.to_le_bytes())?;
    write_extensible_fmt_payload(&mut file, format)?;

    file.write_all(chunk::DATA_ID)?;
    file.write_all(&(data_len as u32).to_le_bytes())?;
    let zeros = vec![0u8; 1 << 16];
    let mut written = 0u64;
    while written < data_len {
        let this = zeros.len().min((data_len - written) as usize);
        file.write_all(&zeros[..this])?;
        written += this as u64;
    }
    if pad == 1 {
        file.write_all(&[0u8])?;
    }
    Ok(())
}

fn write_extensible_fmt_payload(file: &mut File, format: &WaveFormat) -> Result<(), CodecError> {
    const KSDATAFORMAT_SUBTYPE_PCM: [u8; 16] = [
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71,
    ];
    file.write_all(&0xFFFEu16.to_le_bytes())?;
    file.write_all(&format.channels.to_le_bytes())?;
    file.write_all(&format.sample_rate.to_le_bytes())?;
    let bytes_per_sec = format.block_align as u32 * format.sample_rate;
    file.write_all(&bytes_per_sec.to_le_bytes())?;
    file.write_all(&format.block_align.to_le_bytes())?;
    file.write_all(&format.bits_per_sample.to_le_bytes())?;
    file.write_all(&22u16.to_le_bytes())?;
    file.write_all(&format.bits_per_sample.to_le_bytes())?;
    file.write_all(&format.channel_mask.to_le_bytes())?;
    file.write_all(&KSDATAFORMAT_SUBTYPE_PCM)?;
    Ok(())
}

/// Copies `src` byte-for-byte to `dest`, for save-as onto a distinct,
/// already-existing destination path.
pub fn copy_file(src: &Path, dest: &Path) -> Result<(), CodecError> {
    std::fs::copy(src, dest)?;
    Ok(())
}

/// Opens `path` for read-write. Matches the source's "exclusive write,
/// shared read" intent via the platform's ordinary advisory file locking
/// (no additional locking layer is added here).
pub fn open_read_write(path: &Path) -> Result<File, CodecError> {
    Ok(OpenOptions::new().read(true).write(true).open(path)?)
}

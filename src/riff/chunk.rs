//! RIFF chunk scanning primitives: the 12-byte container header, generic
//! chunk headers, and the sequential scan that locates the `fmt ` and
//! waveform (`data` or `LIST`/`wavl`) chunks.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::{debug, warn};

use crate::config::SCAN_ITERATION_CAP;
use crate::error::{CodecError, ResultFlags};

pub const RIFF_ID: &[u8; 4] = b"RIFF";
pub const WAVE_ID: &[u8; 4] = b"WAVE";
pub const FMT_ID: &[u8; 4] = b"fmt ";
pub const DATA_ID: &[u8; 4] = b"data";
pub const LIST_ID: &[u8; 4] = b"LIST";
pub const WAVL_ID: &[u8; 4] = b"wavl";
pub const SLNT_ID: &[u8; 4] = b"slnt";
pub const PLST_ID: &[u8; 4] = b"plst";
pub const SMPL_ID: &[u8; 4] = b"smpl";

/// The 12-byte RIFF container header.
#[derive(Debug, Clone, Copy)]
pub struct RiffHeader {
    pub declared_size: u32,
}

/// Reads and validates the 12-byte RIFF/WAVE header. `fh` must be positioned
/// at the start of the file.
pub fn read_riff_header(fh: &mut File) -> Result<RiffHeader, CodecError> {
    let mut id = [0u8; 4];
    fh.read_exact(&mut id)?;
    if &id != RIFF_ID {
        return Err(CodecError::NotWave);
    }
    let declared_size = fh.read_u32::<LittleEndian>()?;
    let mut wave_id = [0u8; 4];
    fh.read_exact(&mut wave_id)?;
    if &wave_id != WAVE_ID {
        return Err(CodecError::NotWave);
    }
    Ok(RiffHeader { declared_size })
}

/// Confirms the on-disk size minus 8 equals the declared RIFF size.
pub fn validate_riff_size(fh: &mut File, declared_size: u32) -> Result<u64, CodecError> {
    let actual_total = fh.seek(SeekFrom::End(0))?;
    let actual = actual_total.saturating_sub(8);
    if actual != declared_size as u64 {
        return Err(CodecError::BadSize {
            declared: declared_size as u64,
            actual,
        });
    }
    Ok(actual_total)
}

/// One located chunk: an absolute payload offset (just past the 8-byte
/// header, and past the 4-byte list form-type for a `wavl` `LIST`) plus the
/// chunk's declared payload size, excluding any form-type already consumed.
#[derive(Debug, Clone, Copy)]
pub struct ChunkLocation {
    pub payload_offset: u64,
    pub payload_size: u32,
    pub is_list: bool,
}

/// The result of scanning the chunk sequence following the RIFF header.
#[derive(Debug, Clone, Copy)]
pub struct ChunkTable {
    pub fmt_chunk: ChunkLocation,
    pub waveform_chunk: ChunkLocation,
    pub warnings: ResultFlags,
}

/// Scans chunks sequentially from offset 12 through `total_len`, locating at
/// most one `fmt ` chunk and at most one waveform chunk (`data` or a `LIST`
/// of sub-type `wavl`). `plst`/`smpl` raise a non-fatal warning; unknown
/// chunks are skipped silently. Each chunk advances by
/// `size + (size % 2)` past its 8-byte header, respecting pad-to-even.
pub fn scan_chunks(fh: &mut File, total_len: u64) -> Result<ChunkTable, CodecError> {
    let mut position: u64 = 12;
    let mut fmt_chunk: Option<ChunkLocation> = None;
    let mut waveform_chunk: Option<ChunkLocation> = None;
    let mut warnings = ResultFlags::default();
    let mut exhausted = true;

    for _ in 0..SCAN_ITERATION_CAP {
        if position + 8 > total_len {
            exhausted = false;
            break;
        }
        fh.seek(SeekFrom::Start(position))?;
        let mut id = [0u8; 4];
        fh.read_exact(&mut id)?;
        let size = fh.read_u32::<LittleEndian>()?;
        let header_end = position + 8;

        if &id == FMT_ID {
            if fmt_chunk.is_some() {
                return Err(CodecError::BadWave("more than one fmt chunk".into()));
            }
            fmt_chunk = Some(ChunkLocation {
                payload_offset: header_end,
                payload_size: size,
                is_list: false,
            });
        } else if &id == DATA_ID {
            if waveform_chunk.is_some() {
                return Err(CodecError::BadWave("more than one waveform chunk".into()));
            }
            debug!(offset = header_end, size, "found data chunk");
            waveform_chunk = Some(ChunkLocation {
                payload_offset: header_end,
                payload_size: size,
                is_list: false,
            });
        } else if &id == LIST_ID {
            let mut form_type = [0u8; 4];
            fh.read_exact(&mut form_type)?;
            if &form_type == WAVL_ID {
                if waveform_chunk.is_some() {
                    return Err(CodecError::BadWave("more than one waveform chunk".into()));
                }
                debug!(offset = header_end + 4, size, "found wavl list chunk");
                waveform_chunk = Some(ChunkLocation {
                    payload_offset: header_end + 4,
                    payload_size: size.saturating_sub(4),
                    is_list: true,
                });
            }
            // Non-wavl LIST chunks fall through to the generic skip below;
            // the 4 bytes already read are accounted for by the size-based
            // seek rather than literally unread.
        } else if &id == PLST_ID || &id == SMPL_ID {
            warn!(chunk = ?String::from_utf8_lossy(&id), "non-fatal chunk encountered");
            warnings |= ResultFlags::CHUNK_WARNING;
        }

        let padded_size = size as u64 + (size as u64 % 2);
        position = header_end + padded_size;
    }

    if exhausted {
        return Err(CodecError::BadWave(
            "chunk scan exceeded the iteration cap without reaching the end of the file".into(),
        ));
    }

    let fmt_chunk = fmt_chunk.ok_or_else(|| CodecError::BadWave("no fmt chunk found".into()))?;
    let waveform_chunk =
        waveform_chunk.ok_or_else(|| CodecError::BadWave("no waveform chunk found".into()))?;

    Ok(ChunkTable {
        fmt_chunk,
        waveform_chunk,
        warnings,
    })
}

//! Black-box coverage of the six literal end-to-end scenarios, driving the
//! public API against freshly-written WAVE fixtures.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};

use tempfile::tempdir;

use wavedit::riff::codec;
use wavedit::{ChangeType, CodecError, ResultFlags, SampleLayout, WaveFile, WaveFormat};

fn pcm_format(channels: u16, bits_per_sample: u16, channel_mask: u32, sample_rate: u32) -> WaveFormat {
    let byte_depth = bits_per_sample / 8;
    let block_align = byte_depth * channels;
    WaveFormat {
        channels,
        sample_rate,
        bits_per_sample,
        byte_depth,
        block_align,
        channel_mask,
    }
}

/// Scenario 1: 16-bit mono `data`-chunk file of 8192 samples at 44100 Hz.
#[test]
fn scenario_1_mono_16bit_8192_samples() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mono.wav");
    let format = pcm_format(1, 16, 0x4, 44100);
    codec::create_new_file(&path, &format, 8192).unwrap();

    let (wave, warnings) = WaveFile::open(&path).unwrap();
    assert_eq!(wave.channel_count(), 1);
    assert_eq!(wave.padded_sample_length(), 8192);
    assert_eq!(warnings, ResultFlags::FILE_READ_SUCCESS);
}

/// Scenario 2: 24-bit stereo file of 10000 samples pads to 16384 and
/// decodes into double-precision segmented functions.
#[test]
fn scenario_2_stereo_24bit_10000_samples_pads_to_16384() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stereo.wav");
    let format = pcm_format(2, 24, 0x1 | 0x2, 48000);
    codec::create_new_file(&path, &format, 10000).unwrap();

    let (wave, _warnings) = WaveFile::open(&path).unwrap();
    assert_eq!(wave.channel_count(), 2);
    assert_eq!(wave.padded_sample_length(), 16384);
    assert_eq!(wave.sample_layout(), SampleLayout::Double);
}

/// Scenario 3: extensible 32-bit 5.1 file; warning-less success with the
/// standard speaker names in channel order.
#[test]
fn scenario_3_extensible_5_1_channel_names() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("surround.wav");
    // FL | FR | FC | LFE | BL | BR
    let mask_5_1 = 0x1 | 0x2 | 0x4 | 0x8 | 0x10 | 0x20;
    let format = pcm_format(6, 32, mask_5_1, 48000);
    codec::create_new_file(&path, &format, 4096).unwrap();

    let (wave, warnings) = WaveFile::open(&path).unwrap();
    assert_eq!(warnings, ResultFlags::FILE_READ_SUCCESS);
    let names: Vec<String> = (0..6).map(|i| wave.channel_name(i)).collect();
    assert_eq!(
        names,
        vec![
            "Front Left",
            "Front Right",
            "Front Center",
            "Low Frequency",
            "Back Left",
            "Back Right",
        ]
    );
}

/// Scenario 4: MULTIPLY by 0 over the full spectrum, smoothing 0; after
/// inverse transform and save, decoded samples quantise to silence.
#[test]
fn scenario_4_multiply_by_zero_quantises_to_silence() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("silence.wav");
    let format = pcm_format(1, 16, 0x4, 44100);
    codec::create_new_file(&path, &format, 256).unwrap();

    let (mut wave, _) = WaveFile::open(&path).unwrap();
    let container_len = wave.padded_sample_length() / 2;
    assert!(wave.apply(0, 0, container_len - 1, ChangeType::Multiplicative, 0.0, 0.0));
    wave.save().unwrap();

    let mut file = File::open(&path).unwrap();
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).unwrap();
    let data = find_data_chunk(&bytes);
    for frame in data.chunks_exact(2) {
        let v = i16::from_le_bytes([frame[0], frame[1]]);
        assert!(v.abs() <= 1, "expected quantised silence, got {v}");
    }
}

/// Scenario 5: apply, apply, undo, apply on a mono file; history has three
/// records from the sentinel, cursor at the last, forward chain truncated.
#[test]
fn scenario_5_apply_apply_undo_apply_truncates_history() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.wav");
    let format = pcm_format(1, 16, 0x4, 44100);
    codec::create_new_file(&path, &format, 256).unwrap();

    let (mut wave, _) = WaveFile::open(&path).unwrap();
    let container_len = wave.padded_sample_length() / 2;

    assert!(wave.apply(0, 0, container_len / 4, ChangeType::Multiplicative, 0.5, 0.1));
    assert!(wave.apply(0, container_len / 4, container_len / 2, ChangeType::Additive, 0.1, 0.2));
    assert!(wave.undo());
    assert!(wave.apply(0, 0, container_len / 8, ChangeType::Multiplicative, 2.0, 0.0));

    assert_eq!(wave.history().len(), 3);
    assert_eq!(wave.history().cursor(), 2);
    assert!(!wave.history().can_redo());
}

/// Scenario 6: a RIFF size field that disagrees with the on-disk size by
/// one byte is rejected as `BadSize`, with no resources leaked.
#[test]
fn scenario_6_bad_riff_size_is_rejected_cleanly() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("truncated.wav");
    let format = pcm_format(1, 16, 0x4, 44100);
    codec::create_new_file(&path, &format, 4096).unwrap();

    // Corrupt the RIFF declared size (bytes 4..8) by adding one.
    let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
    let mut size_bytes = [0u8; 4];
    file.seek(SeekFrom::Start(4)).unwrap();
    file.read_exact(&mut size_bytes).unwrap();
    let declared = u32::from_le_bytes(size_bytes);
    file.seek(SeekFrom::Start(4)).unwrap();
    file.write_all(&(declared + 1).to_le_bytes()).unwrap();
    drop(file);

    let result = WaveFile::open(&path);
    assert!(matches!(result, Err(CodecError::BadSize { .. })));
    // The file itself is untouched by the failed open; no stray temp files
    // are created alongside it.
    assert_eq!(dir.path().read_dir().unwrap().count(), 1);
}

fn find_data_chunk(bytes: &[u8]) -> &[u8] {
    let mut offset = 12usize;
    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = u32::from_le_bytes(bytes[offset + 4..offset + 8].try_into().unwrap()) as usize;
        let payload_start = offset + 8;
        if id == b"data" {
            return &bytes[payload_start..payload_start + size];
        }
        offset = payload_start + size + (size % 2);
    }
    panic!("no data chunk found");
}

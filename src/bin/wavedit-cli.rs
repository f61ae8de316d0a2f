//! Diagnostic command-line entry point standing in for the out-of-scope
//! GUI shell: drives `wavedit`'s open/apply/undo/redo/save surface from
//! subcommands, for manual smoke-testing and for black-box integration
//! tests.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use wavedit::{ChangeType, WaveFile};

#[derive(Parser)]
#[command(name = "wavedit-cli", about = "Frequency-domain WAVE editor")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open an existing WAVE file and print its metadata.
    Open { path: PathBuf },
    /// Create a new silent WAVE file in memory and save it.
    New {
        path: PathBuf,
        #[arg(long, default_value_t = 1.0)]
        seconds: f64,
        #[arg(long, default_value_t = 44100)]
        rate: u32,
        #[arg(long, default_value_t = 2)]
        depth: u16,
    },
    /// Apply a spectral edit, then save in place.
    Apply {
        path: PathBuf,
        from: u64,
        to: u64,
        #[arg(long, value_enum)]
        kind: EditKind,
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value_t = 0.0)]
        smoothing: f64,
        #[arg(long, default_value_t = 0)]
        channel: usize,
    },
    /// Undo the most recent edit, then save in place.
    Undo { path: PathBuf },
    /// Redo the most recently undone edit, then save in place.
    Redo { path: PathBuf },
    /// Re-save a file in place with no further change.
    Save { path: PathBuf },
    /// Save a file to a different destination path.
    SaveAs { path: PathBuf, dest: PathBuf },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum EditKind {
    Multiply,
    Additive,
}

impl From<EditKind> for ChangeType {
    fn from(kind: EditKind) -> Self {
        match kind {
            EditKind::Multiply => ChangeType::Multiplicative,
            EditKind::Additive => ChangeType::Additive,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Open { path } => {
            let (wave, warnings) = WaveFile::open(&path).map_err(|e| e.to_string())?;
            println!(
                "channels={} sample_rate={} sample_length={} warnings={:?}",
                wave.channel_count(),
                wave.sample_rate(),
                wave.sample_length(),
                warnings
            );
            for i in 0..wave.channel_count() as u16 {
                println!("  channel {i}: {}", wave.channel_name(i));
            }
            Ok(())
        }
        Command::New { path, seconds, rate, depth } => {
            let mut wave = WaveFile::new_file(seconds, rate, depth).map_err(|e| e.to_string())?;
            wave.save_as(&path).map_err(|e| e.to_string())
        }
        Command::Apply {
            path,
            from,
            to,
            kind,
            amount,
            smoothing,
            channel,
        } => {
            let (mut wave, _warnings) = WaveFile::open(&path).map_err(|e| e.to_string())?;
            if !wave.apply(channel, from, to, kind.into(), amount, smoothing) {
                return Err("edit could not be applied (out-of-range sample indices?)".to_string());
            }
            wave.save().map_err(|e| e.to_string())
        }
        Command::Undo { path } => {
            let (mut wave, _warnings) = WaveFile::open(&path).map_err(|e| e.to_string())?;
            if !wave.undo() {
                return Err("nothing to undo".to_string());
            }
            wave.save().map_err(|e| e.to_string())
        }
        Command::Redo { path } => {
            let (mut wave, _warnings) = WaveFile::open(&path).map_err(|e| e.to_string())?;
            if !wave.redo() {
                return Err("nothing to redo".to_string());
            }
            wave.save().map_err(|e| e.to_string())
        }
        Command::Save { path } => {
            let (mut wave, _warnings) = WaveFile::open(&path).map_err(|e| e.to_string())?;
            wave.save().map_err(|e| e.to_string())
        }
        Command::SaveAs { path, dest } => {
            let (mut wave, _warnings) = WaveFile::open(&path).map_err(|e| e.to_string())?;
            wave.save_as(&dest).map_err(|e| e.to_string())
        }
    }
}

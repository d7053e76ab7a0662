//! sampler - plays WAV files (or a test tone) through the sampler engine
//!
//! Run with: cargo run --bin sampler -- kick.wav snare.wav --layout interleaved

mod app;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Result as EyreResult, WrapErr};
use source_sampler::{io::wav::read_wav, sound::layout::NoteLayout, EngineConfig};
use tracing_subscriber::EnvFilter;

use app::Player;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Layout {
    Contiguous,
    Interleaved,
    All,
}

impl From<Layout> for NoteLayout {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Contiguous => NoteLayout::Contiguous,
            Layout::Interleaved => NoteLayout::Interleaved,
            Layout::All => NoteLayout::All,
        }
    }
}

/// Polyphonic sample player demo.
#[derive(Parser, Debug)]
#[command(name = "sampler")]
#[command(version)]
struct Args {
    /// WAV files to load, in order. A test tone is used when none are given.
    files: Vec<PathBuf>,

    /// How the loaded sounds are spread across the keyboard.
    #[arg(long, value_enum, default_value = "contiguous")]
    layout: Layout,

    /// Engine settings (TOML). The sample rate is always taken from the device.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Milliseconds each demo note is held.
    #[arg(long, default_value = "600")]
    note_ms: u64,
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path).wrap_err("failed to load engine config")?,
        None => EngineConfig::default(),
    };

    let mut sources = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let audio = read_wav(path).wrap_err_with(|| format!("failed to read {}", path.display()))?;
        sources.push(audio);
    }

    Player::new(config)
        .sounds(sources)
        .layout(args.layout.into())
        .note_length(std::time::Duration::from_millis(args.note_ms))
        .run()
}

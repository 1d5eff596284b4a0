//! solfacli - elementary score pipeline CLI
//!
//! Takes a recording or a score file and produces a simplified, C-major
//! two-part score with chord accompaniment and solfège lyrics, as
//! MusicXML or ABC.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};

use arrange::{assemble, export, AssembleOptions, ExportFormat, Score};
use score_import::EventSequence;
use transcribe::ExternalCommandEstimator;

#[derive(Parser)]
#[command(name = "solfacli")]
#[command(about = "Turn a tune into a simplified C-major score with chords and solfège")]
#[command(version)]
struct Cli {
    /// Input file: audio (.wav, .mp3) or score (.mid, .musicxml, .abc)
    input: PathBuf,

    /// Output path; defaults to a suggested filename in the current directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Musicxml)]
    format: Format,

    /// Melody only, no block-chord accompaniment part
    #[arg(long)]
    no_accompaniment: bool,

    /// Skip the solfège lyric line
    #[arg(long)]
    no_solfege: bool,

    /// External audio-to-MIDI command used for audio input
    #[arg(long, default_value = "basic-pitch")]
    transcriber: String,

    /// Print a machine-readable summary instead of prose
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Musicxml,
    Abc,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Musicxml => ExportFormat::MusicXml,
            Format::Abc => ExportFormat::Abc,
        }
    }
}

#[derive(serde::Serialize)]
struct Summary {
    input: String,
    output: String,
    format: &'static str,
    notes: usize,
    measures: usize,
    tempo_bpm: u32,
    source_tempo_bpm: Option<f64>,
    detected_key: Option<String>,
    chords: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let bytes = std::fs::read(&cli.input)
        .with_context(|| format!("cannot read {}", cli.input.display()))?;
    let filename = cli
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let raw = load_events(&bytes, &filename, &cli.transcriber)?;

    let options = AssembleOptions {
        with_accompaniment: !cli.no_accompaniment,
        with_solfege: !cli.no_solfege,
    };
    let score = assemble(&raw, options);

    let artifact = export(&score, cli.format.into());
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&artifact.filename));
    std::fs::write(&output, &artifact.bytes)
        .with_context(|| format!("cannot write {}", output.display()))?;

    report(&cli, &score, raw.source_tempo_bpm, &output)?;
    Ok(())
}

fn is_audio(filename: &str) -> bool {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    matches!(ext.as_str(), "wav" | "mp3")
}

fn load_events(bytes: &[u8], filename: &str, transcriber: &str) -> Result<EventSequence> {
    if is_audio(filename) {
        let estimator = ExternalCommandEstimator::new(transcriber);
        match transcribe::transcribe(bytes, &estimator) {
            Ok(sequence) => Ok(sequence),
            Err(transcribe::Error::Unavailable(message)) => {
                bail!("transcription unavailable: {message}")
            }
            Err(e) => Err(e).context("failed to transcribe audio"),
        }
    } else {
        score_import::import(bytes, filename)
            .with_context(|| format!("failed to import {filename}"))
    }
}

fn report(cli: &Cli, score: &Score, source_tempo_bpm: Option<f64>, output: &Path) -> Result<()> {
    if cli.json {
        let summary = Summary {
            input: cli.input.display().to_string(),
            output: output.display().to_string(),
            format: ExportFormat::from(cli.format).extension(),
            notes: score.melody.notes().count(),
            measures: score.measure_count(),
            tempo_bpm: score.tempo_bpm,
            source_tempo_bpm,
            detected_key: score.detected_key.map(|k| k.name()),
            chords: score.chords.iter().map(|c| c.label.to_string()).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("wrote {}", output.display());
        if let Some(bpm) = source_tempo_bpm {
            println!("source tempo: {:.0} bpm", bpm);
        }
        if let Some(key) = &score.detected_key {
            println!("detected key: {}", key.name());
        }
        let chords: Vec<String> = score.chords.iter().map(|c| c.label.to_string()).collect();
        println!(
            "{} notes, {} measures, chords: {}",
            score.melody.notes().count(),
            score.measure_count(),
            chords.join(" ")
        );
    }
    Ok(())
}

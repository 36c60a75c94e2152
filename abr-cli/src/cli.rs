use std::path::PathBuf;

use clap::Parser;

/// Drives `abr-core` against a scripted telemetry trace and prints the
/// resulting decisions.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to a catalogue descriptor (`.toml` or `.json`).
    #[arg(short, long)]
    pub catalogue: PathBuf,

    /// Quality policy: `random`, `bb`, or `minerva`.
    #[arg(short, long, default_value = "bb")]
    pub policy: String,

    /// Path to a scripted telemetry trace (one JSON event per line).
    #[arg(short, long)]
    pub trace: PathBuf,

    /// Fixed `min_rtt` (ms) fed to the simulated congestion hook; only used
    /// by the `minerva` policy.
    #[arg(long, default_value_t = 40)]
    pub min_rtt_ms: u32,

    /// Enable debug-level logging.
    #[arg(short, long)]
    pub verbose: bool,
}

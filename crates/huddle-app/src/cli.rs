use std::path::PathBuf;

use clap::Parser;

/// Huddle: run a scripted video call against the in-process engine.
#[derive(Parser, Debug)]
#[command(name = "huddle", version, about)]
pub struct Args {
    /// Channel to join.
    #[arg(short = 'c', long, default_value = "study-room")]
    pub channel: String,

    /// Preferred local identity. The engine may assign a different one.
    #[arg(short = 'i', long)]
    pub identity: Option<String>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// How long the scripted call lasts.
    #[arg(long, default_value_t = 6)]
    pub duration_secs: u64,

    /// Number of simulated remote participants.
    #[arg(long, default_value_t = 2)]
    pub peers: usize,

    /// Simulate camera/microphone permission being denied.
    #[arg(long)]
    pub deny_devices: bool,
}

pub fn parse() -> Args {
    Args::parse()
}

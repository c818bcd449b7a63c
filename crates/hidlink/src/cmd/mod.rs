use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod doctor;
pub mod listen;
pub mod scan;
pub mod send;
pub mod version;

/// Global options shared by every subcommand.
#[derive(Debug)]
pub struct Context {
    pub format: OutputFormat,
    pub config: Option<PathBuf>,
    pub adapter: Option<u16>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover nearby devices and print them.
    Scan(ScanArgs),
    /// Connect to devices and print received frames.
    Listen(ListenArgs),
    /// Connect to one device and send a single frame.
    Send(SendArgs),
    /// Run local environment health checks.
    Doctor(DoctorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, ctx: &Context) -> CliResult<i32> {
    match command {
        Command::Scan(args) => scan::run(args, ctx),
        Command::Listen(args) => listen::run(args, ctx),
        Command::Send(args) => send::run(args, ctx),
        Command::Doctor(args) => doctor::run(args, ctx),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Inquiry rounds to run (about 1.28 s each).
    #[arg(long, default_value = "3")]
    pub rounds: u32,
    /// Maximum number of devices to record.
    #[arg(long, default_value = "4")]
    pub capacity: usize,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Device addresses to connect to. Default: discover.
    pub addresses: Vec<String>,
    /// Inquiry rounds when discovering.
    #[arg(long, default_value = "3")]
    pub rounds: u32,
    /// Maximum number of devices when discovering.
    #[arg(long, default_value = "4")]
    pub capacity: usize,
    /// Exit after printing N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Readiness wait per poll (e.g. 10ms, 1s). Overrides the config file.
    #[arg(long)]
    pub poll_timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Device address (e.g. 00:1F:32:AA:BB:CC).
    pub address: String,
    /// Frame bytes as hex (e.g. "52 11 10" or 521110).
    #[arg(long)]
    pub data: String,
    /// Wait for one inbound frame and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

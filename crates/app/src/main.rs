mod commands;

use anyhow::Context;
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use commands::{parse_command, Command};
use soundsentry_alarm::{missing_playback_tools, AlarmChain, AlarmTrigger};
use soundsentry_audio::{CaptureStream, DeviceManager};
use soundsentry_foundation::{real_clock, DiagnosticSink};
use soundsentry_level::MonitorConfig;
use soundsentry_monitor::MonitorHandle;

#[derive(Parser)]
#[command(name = "soundsentry")]
#[command(version)]
#[command(about = "Continuous sound-level monitor with a configurable alarm")]
struct Cli {
    /// Input device index (see --list-devices)
    #[arg(short = 'D', long)]
    device: Option<usize>,

    /// List audio devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Alarm threshold in dB
    #[arg(short, long)]
    threshold: Option<f32>,

    /// Cooldown between alarms, in seconds
    #[arg(short, long)]
    cooldown: Option<f32>,

    /// Seconds between level checks
    #[arg(short, long)]
    interval: Option<f32>,

    /// Audio sampling rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Samples per buffer
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Alarm tone duration, in seconds
    #[arg(long)]
    alarm_duration: Option<f32>,

    /// Output device identifier for alarm playback
    #[arg(long)]
    output_device: Option<String>,

    /// TOML config file; CLI flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Interactive output goes straight to the console; the tracing pipeline is
/// file-only so log lines never tangle with the prompt.
struct ConsoleSink;

impl DiagnosticSink for ConsoleSink {
    fn line(&self, text: &str) {
        println!("{}", text);
    }
}

fn init_logging() -> anyhow::Result<()> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "soundsentry.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(non_blocking_file)
        .with_env_filter(log_level)
        .with_ansi(false)
        .init();
    std::mem::forget(guard);
    Ok(())
}

fn build_config(cli: &Cli) -> anyhow::Result<MonitorConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => MonitorConfig::default(),
    };

    if let Some(v) = cli.threshold {
        config.threshold_db = v;
    }
    if let Some(v) = cli.cooldown {
        config.cooldown_secs = v;
    }
    if let Some(v) = cli.interval {
        config.update_interval_secs = v;
    }
    if let Some(v) = cli.sample_rate {
        config.sample_rate_hz = v;
    }
    if let Some(v) = cli.chunk_size {
        config.chunk_size = v;
    }
    if let Some(v) = cli.alarm_duration {
        config.alarm_duration_secs = v;
    }
    if cli.device.is_some() {
        config.device_index = cli.device;
    }
    Ok(config)
}

fn list_devices() -> anyhow::Result<()> {
    let manager = DeviceManager::new();
    println!("Input devices:");
    for info in manager.list_inputs()? {
        let marker = if info.is_default { " (default)" } else { "" };
        println!("  [{}] {}{}", info.index, info.name, marker);
    }
    println!("Output devices:");
    for info in manager.list_outputs()? {
        let marker = if info.is_default { " (default)" } else { "" };
        println!("  [{}] {}{}", info.index, info.name, marker);
    }
    Ok(())
}

fn print_help() {
    println!("Commands: q=quit, t<dB>=set threshold, c<secs>=set cooldown, a[<secs>]=calibrate");
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging()?;
    tracing::info!("Starting SoundSentry");

    if cli.list_devices {
        return list_devices();
    }

    let config = build_config(&cli)?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

    let missing = missing_playback_tools();
    if !missing.is_empty() {
        println!("Note: for best alarm sounds, consider installing these packages:");
        let packages: Vec<&str> = missing.iter().map(|t| t.package_hint).collect();
        println!("  sudo apt-get install {}", packages.join(" "));
        println!("Continuing with console bell as fallback...\n");
    }

    let alarm: Arc<dyn AlarmTrigger> =
        Arc::new(AlarmChain::standard().with_output_device(cli.output_device.clone()));
    let sink: Arc<dyn DiagnosticSink> = Arc::new(ConsoleSink);

    let sample_rate = config.sample_rate_hz;
    let chunk_size = config.chunk_size;
    let device_index = config.device_index;
    let handle = MonitorHandle::spawn(
        config.clone(),
        move || CaptureStream::open(sample_rate, chunk_size, device_index),
        alarm,
        sink,
        real_clock(),
    )?;

    println!(
        "Monitoring started. Alarm will trigger above {} dB",
        config.threshold_db
    );
    print_help();

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(Command::Help) => print_help(),
            Ok(Command::SetThreshold(db)) => {
                handle.set_threshold_db(db);
                println!("Threshold updated to {} dB", handle.threshold_db());
            }
            Ok(Command::SetCooldown(secs)) => {
                handle.set_cooldown(Duration::from_secs_f32(secs));
                println!("Cooldown updated to {} s", secs);
            }
            Ok(Command::Calibrate(secs)) => {
                println!("Calibrating for {} s, keep the room at its normal ambient level...", secs);
                match handle.calibrate(Duration::from_secs_f32(secs)) {
                    Ok(mean) => println!(
                        "Ambient level: {:.1} dB. Suggested threshold: {:.1} dB (apply with t{:.0})",
                        mean,
                        mean + 10.0,
                        mean + 10.0
                    ),
                    Err(e) => println!("Calibration failed: {}", e),
                }
            }
            Err(msg) => {
                if !line.trim().is_empty() {
                    println!("{}", msg);
                }
            }
        }
    }

    let stats = handle.stats();
    handle.stop()?;
    println!(
        "Monitoring stopped. {} checks, {} read errors, {} alarms.",
        stats.cycles.load(Ordering::Relaxed),
        stats.read_errors.load(Ordering::Relaxed),
        stats.alarms_fired.load(Ordering::Relaxed)
    );
    Ok(())
}

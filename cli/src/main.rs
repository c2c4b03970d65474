// proxid — BLE proximity identifier tool
//
// Drives the proxid core against a JSON device registry: build the
// advertisement for a remote device, identify observed payloads, and inspect
// the rotating EIDs behind them.

mod config;
mod devices;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use devices::DeviceFile;
use proxid_core::advertisement::Advertisement;
use proxid_core::clock::MILLIS_PER_MINUTE;
use proxid_core::eid::AdjacentKind;
use proxid_core::{
    BeaconSeed, Clock, DataWithTimestamp, EidGenerator, ManualClock, RemoteDevice, RotationMode,
    SystemClock,
};
use rand::RngCore;
use std::path::PathBuf;
use std::sync::Arc;

const MILLIS_PER_DAY: i64 = 24 * 60 * MILLIS_PER_MINUTE;
const SEED_LEN: usize = 32;

#[derive(Parser)]
#[command(name = "proxid")]
#[command(about = "proxid — rotating BLE proximity identifiers", long_about = None)]
#[command(version)]
struct Cli {
    /// Device registry file (overrides the configured path)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Evaluate at this time (ms since the Unix epoch) instead of now
    #[arg(long, global = true, allow_negative_numbers = true)]
    at: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage known remote devices
    Device {
        #[command(subcommand)]
        action: DeviceAction,
    },
    /// Generate an Ed25519 key pair for use as a local public key
    Keygen,
    /// Build the advertisement to broadcast to a remote device
    Advertise {
        device: String,
        /// Local public key (hex)
        #[arg(short, long)]
        public_key: String,
    },
    /// Identify the device behind an observed payload (hex)
    Identify { payload: String },
    /// Show the nearest EIDs of a device
    Eids {
        device: String,
        #[arg(short, long, value_enum, default_value = "foreground")]
        mode: ModeArg,
    },
    /// Show the bare background service data of a device
    ServiceData { device: String },
    /// Show the scan filter EIDs of a device
    ScanFilter { device: String },
    /// List the advertisements a device should expect from a public key
    Expect {
        device: String,
        /// Broadcaster public key (hex)
        #[arg(short, long)]
        public_key: String,
        #[arg(short, long, value_enum, default_value = "foreground")]
        mode: ModeArg,
    },
    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum DeviceAction {
    /// Register a device with freshly generated beacon seeds
    New {
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        /// Device public key (hex); generated when omitted
        #[arg(short, long)]
        public_key: Option<String>,
        /// Number of consecutive seeds
        #[arg(long, default_value = "2")]
        seeds: u32,
        /// Lifetime of each seed in days
        #[arg(long, default_value = "14")]
        seed_days: u32,
    },
    List,
    Show { id: String },
    Remove { id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    Set { key: String, value: String },
    Get { key: String },
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Foreground,
    Background,
}

impl From<ModeArg> for RotationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Foreground => RotationMode::Foreground,
            ModeArg::Background => RotationMode::Background,
        }
    }
}

/// Runtime context shared by the commands
struct Runtime {
    config: config::Config,
    registry_path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl Runtime {
    fn devices(&self) -> Result<DeviceFile> {
        DeviceFile::open(self.registry_path.clone())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .init();

    let registry_path = match cli.registry {
        Some(path) => path,
        None => config.registry_file()?,
    };
    let clock: Arc<dyn Clock> = match cli.at {
        Some(at) => Arc::new(ManualClock::new(at)),
        None => Arc::new(SystemClock),
    };
    let ctx = Runtime {
        config,
        registry_path,
        clock,
    };

    match cli.command {
        Commands::Device { action } => cmd_device(&ctx, action),
        Commands::Keygen => cmd_keygen(),
        Commands::Advertise { device, public_key } => cmd_advertise(&ctx, &device, &public_key),
        Commands::Identify { payload } => cmd_identify(&ctx, &payload),
        Commands::Eids { device, mode } => cmd_eids(&ctx, &device, mode.into()),
        Commands::ServiceData { device } => cmd_service_data(&ctx, &device),
        Commands::ScanFilter { device } => cmd_scan_filter(&ctx, &device),
        Commands::Expect {
            device,
            public_key,
            mode,
        } => cmd_expect(&ctx, &device, &public_key, mode.into()),
        Commands::Config { action } => cmd_config(ctx.config, action),
    }
}

fn cmd_device(ctx: &Runtime, action: DeviceAction) -> Result<()> {
    let devices = ctx.devices()?;

    match action {
        DeviceAction::New {
            id,
            name,
            public_key,
            seeds,
            seed_days,
        } => {
            if seeds == 0 || seed_days == 0 {
                anyhow::bail!("--seeds and --seed-days must be positive");
            }
            let public_key = match public_key {
                Some(key) => decode_hex(&key, "public key")?,
                None => new_signing_key().verifying_key().to_bytes().to_vec(),
            };

            let now = ctx.clock.now_millis();
            let first_start = now - now.rem_euclid(MILLIS_PER_DAY);
            let seed_span = i64::from(seed_days) * MILLIS_PER_DAY;
            let beacon_seeds = (0..i64::from(seeds))
                .map(|i| {
                    let mut secret = vec![0u8; SEED_LEN];
                    rand::thread_rng().fill_bytes(&mut secret);
                    let start = first_start + i * seed_span;
                    BeaconSeed::new(secret, start, start + seed_span)
                })
                .collect();

            let mut device = RemoteDevice::new(id.clone(), public_key).with_beacon_seeds(beacon_seeds);
            if let Some(name) = name {
                device = device.with_name(name);
            }
            devices.add(device)?;

            println!("{} Registered device {}", "✓".green(), id.bright_cyan());
            println!(
                "  Seeds valid {} → {}",
                format_timestamp(first_start),
                format_timestamp(first_start + i64::from(seeds) * seed_span)
            );
        }

        DeviceAction::List => {
            let snapshot = devices.registry().snapshot();
            if snapshot.is_empty() {
                println!("{}", "No devices registered".dimmed());
                return Ok(());
            }

            println!("{}", format!("Devices ({})", snapshot.len()).bold());
            println!();
            for device in snapshot.iter() {
                let status = if device.has_usable_beacon_seeds() {
                    format!("{} seeds", device.beacon_seeds().len()).green()
                } else {
                    "no seeds".red()
                };
                println!(
                    "  {:<20} {:<20} {}",
                    device.device_id().bright_cyan(),
                    device.name(),
                    status
                );
            }
        }

        DeviceAction::Show { id } => {
            let device = devices.require(&id)?;
            println!("{}", "Device".bold());
            println!("  ID:         {}", device.device_id().bright_cyan());
            println!("  Name:       {}", device.name());
            println!("  Public key: {}", hex::encode(device.public_key()).bright_yellow());
            if let Some(local) = device.paired_local_device_id() {
                println!("  Paired to:  {}", local);
            }
            println!("  Beacon seeds:");
            for seed in device.beacon_seeds() {
                let marker = if seed.contains(ctx.clock.now_millis()) {
                    "●".green()
                } else {
                    "○".dimmed()
                };
                println!(
                    "    {} {} → {}",
                    marker,
                    format_timestamp(seed.start_time_millis()),
                    format_timestamp(seed.end_time_millis())
                );
            }
        }

        DeviceAction::Remove { id } => {
            if devices.remove(&id)? {
                println!("{} Removed device {}", "✓".green(), id.bright_cyan());
            } else {
                anyhow::bail!("Unknown device: {}", id);
            }
        }
    }

    Ok(())
}

fn cmd_keygen() -> Result<()> {
    let signing_key = new_signing_key();

    println!("{}", "Generated Ed25519 key pair".bold());
    println!(
        "  Public key: {}",
        hex::encode(signing_key.verifying_key().to_bytes()).bright_yellow()
    );
    println!("  Secret key: {}", hex::encode(signing_key.to_bytes()));
    println!();
    println!("{}", "Keep the secret key private.".yellow());
    Ok(())
}

fn cmd_advertise(ctx: &Runtime, device_id: &str, public_key: &str) -> Result<()> {
    let public_key = decode_hex(public_key, "public key")?;
    let device = ctx.devices()?.require(device_id)?;

    let generator = ctx.config.proximity()?.build_generator(ctx.clock.clone());
    let advertisement = generator
        .generate_advertisement(&device, &public_key)
        .context("No advertisement available (check key length and beacon seed coverage)")?;

    print_window(&advertisement);
    Ok(())
}

fn cmd_identify(ctx: &Runtime, payload: &str) -> Result<()> {
    let payload = decode_hex(payload, "payload")?;
    let devices = ctx.devices()?;
    let matcher = ctx.config.proximity()?.build_matcher(ctx.clock.clone());

    match Advertisement::parse(&payload) {
        Ok(advertisement) => println!(
            "  {:?} advertisement from key {}",
            advertisement.mode(),
            hex::encode(advertisement.public_key()).bright_yellow()
        ),
        Err(e) => tracing::debug!("Payload is not a framed advertisement: {}", e),
    }

    let snapshot = devices.registry().snapshot();
    match matcher.identify_device_by_advertisement(&payload, &snapshot) {
        Some(device_id) => println!("{} Matched device {}", "✓".green(), device_id.bright_cyan()),
        None => println!("{} No matching device", "✗".red()),
    }
    Ok(())
}

fn cmd_eids(ctx: &Runtime, device_id: &str, mode: RotationMode) -> Result<()> {
    let device = ctx.devices()?.require(device_id)?;
    let proximity = ctx.config.proximity()?;
    let engine = match mode {
        RotationMode::Foreground => proximity.foreground_engine(),
        RotationMode::Background => proximity.background_engine(),
    };

    let now = ctx.clock.now_millis();
    let eids = engine.generate_nearest_eids(device.beacon_seeds(), now, &[]);
    if eids.is_empty() {
        println!("{}", "No beacon seed covers the nearest windows".dimmed());
        return Ok(());
    }

    println!("{}", format!("{:?} EIDs for {}", mode, device_id).bold());
    for eid in &eids {
        let marker = if eid.contains_time(now) { "●".green() } else { "○".dimmed() };
        print!("  {} ", marker);
        print_window(eid);
    }
    Ok(())
}

fn cmd_service_data(ctx: &Runtime, device_id: &str) -> Result<()> {
    let device = ctx.devices()?.require(device_id)?;
    let engine = ctx.config.proximity()?.background_engine();

    let service_data = engine
        .derive_eid(device.beacon_seeds(), ctx.clock.now_millis(), &[])
        .context("No beacon seed covers the current time")?;

    print_window(&service_data);
    Ok(())
}

fn cmd_scan_filter(ctx: &Runtime, device_id: &str) -> Result<()> {
    let device = ctx.devices()?.require(device_id)?;
    let engine = ctx.config.proximity()?.foreground_engine();

    let filter = engine
        .generate_scan_filter(device.beacon_seeds(), ctx.clock.now_millis())
        .context("No beacon seed covers the current time")?;

    println!("{}", format!("Scan filter for {}", device_id).bold());
    print!("  {:<8} ", "current");
    print_window(&filter.current);
    if let Some(adjacent) = &filter.adjacent {
        let label = match adjacent.kind {
            AdjacentKind::Past => "past",
            AdjacentKind::Future => "future",
        };
        print!("  {:<8} ", label);
        print_window(&adjacent.data);
    }
    Ok(())
}

fn cmd_expect(ctx: &Runtime, device_id: &str, public_key: &str, mode: RotationMode) -> Result<()> {
    let public_key = decode_hex(public_key, "public key")?;
    let device = ctx.devices()?.require(device_id)?;
    let matcher = ctx.config.proximity()?.build_matcher(ctx.clock.clone());

    let expected = matcher.expected_advertisements(&device, &public_key, mode);
    if expected.is_empty() {
        println!("{}", "No advertisements expected".dimmed());
    }
    for advertisement in &expected {
        print_window(advertisement);
    }
    Ok(())
}

fn cmd_config(mut config: config::Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save()?;
            println!("{} Set {} = {}", "✓".green(), key.bright_cyan(), value);
        }

        ConfigAction::Get { key } => {
            if let Some(value) = config.get(&key) {
                println!("{} = {}", key.bright_cyan(), value);
            } else {
                anyhow::bail!("Unknown config key: {}", key);
            }
        }

        ConfigAction::List => {
            println!("{}", "Configuration".bold());
            println!();

            for (key, value) in config.list() {
                println!("  {:<28} {}", key.bright_cyan(), value);
            }
        }
    }

    Ok(())
}

fn new_signing_key() -> ed25519_dalek::SigningKey {
    ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng)
}

fn decode_hex(value: &str, what: &str) -> Result<Vec<u8>> {
    hex::decode(value.trim()).with_context(|| format!("Invalid hex {}", what))
}

fn print_window(data: &DataWithTimestamp) {
    println!(
        "{}  {} → {}",
        data.data_in_hex().bright_yellow(),
        format_timestamp(data.start_timestamp_ms),
        format_timestamp(data.end_timestamp_ms)
    );
}

fn format_timestamp(timestamp_ms: i64) -> String {
    use chrono::{DateTime, Local};

    match DateTime::from_timestamp_millis(timestamp_ms) {
        Some(dt) => {
            let local: DateTime<Local> = dt.into();
            local.format("%Y-%m-%d %H:%M").to_string()
        }
        None => format!("{}ms", timestamp_ms),
    }
}

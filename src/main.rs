use anyhow::{Context, Result};
use log::info;
use std::env;

use wmi_safearray::config::{BackendKind, ProbeConfig};
use wmi_safearray::{build_vector, EmulatedBackend, SafeArrayBackend};

const DEFAULT_CONFIG: &str = "config/probe.toml";

fn print_instructions() {
    println!("SafeArray Probe");
    println!("===============");
    println!();
    println!("Builds the one-dimensional SafeArray described in {} and reports its bounds.", DEFAULT_CONFIG);
    println!();
    println!("Usage: safearray_probe [--verbose] [--config PATH]");
    println!("Set SAFEARRAY_BACKEND=native|emulated to override the configured backend.");
    println!();
}

fn main() {
    match real_main() {
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
        Ok(()) => {
            std::process::exit(0);
        }
    }
}

fn real_main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str);

    if verbose {
        env_logger::builder().filter_level(log::LevelFilter::Debug).init();
    } else {
        env_logger::builder().filter_level(log::LevelFilter::Info).init();
    }

    print_instructions();

    let config = match config_path {
        Some(path) => {
            info!("Loading configuration from {}...", path);
            ProbeConfig::load_from_file(path).context("Failed to load configuration file")?
        }
        None if std::path::Path::new(DEFAULT_CONFIG).exists() => {
            info!("Loading configuration from {}...", DEFAULT_CONFIG);
            ProbeConfig::load_from_file(DEFAULT_CONFIG).context("Failed to load configuration file")?
        }
        None => {
            info!("No configuration file found, using defaults");
            ProbeConfig::default()
        }
    };

    match config.backend {
        BackendKind::Emulated => probe(&EmulatedBackend::new(), &config),
        BackendKind::Native => run_native(&config),
    }
}

#[cfg(windows)]
fn run_native(config: &ProbeConfig) -> Result<()> {
    let backend = wmi_safearray::OleAutBackend::new().context("Failed to resolve oleaut32 SafeArray entry points")?;
    probe(&backend, config)
}

#[cfg(not(windows))]
fn run_native(_config: &ProbeConfig) -> Result<()> {
    Err(anyhow::anyhow!("The native backend requires Windows"))
}

fn probe<B: SafeArrayBackend>(backend: &B, config: &ProbeConfig) -> Result<()> {
    let elements = config.elements()?;
    info!(
        "Creating {} vector of {} element(s) at lower bound {} ({:?} backend)",
        config.array.kind,
        elements.len(),
        config.array.lower_bound,
        config.backend
    );

    let array = build_vector(backend, config.array.kind, config.array.lower_bound, &elements)
        .context("Failed to build SafeArray")?;
    let bounds = array.bounds().context("Failed to query SafeArray bounds")?;
    info!(
        "SafeArray {:p}: bounds [{}, {}], {} element(s)",
        array.handle().as_raw(),
        bounds.lower,
        bounds.upper(),
        bounds.len
    );

    array.destroy().context("Failed to destroy SafeArray")?;
    info!("SafeArray destroyed");
    Ok(())
}

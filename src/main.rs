//! Breathpacer - guided breathing pacer
//!
//! Entry point for the desktop window and the terminal runner.

use anyhow::Result;
use breathpacer::audio::engine::AudioEngine;
use breathpacer::config::AppConfig;
use breathpacer::ui::{app::BreathingApp, headless};
use breathpacer::{Pattern, ToneSynthesizer, PRESETS};
use std::path::PathBuf;
use tracing::error;

/// Settings gathered from the command line
#[derive(Debug, Default)]
struct CliOptions {
    config_path: Option<PathBuf>,
    preset: Option<usize>,
    pattern: Option<String>,
    mute: bool,
    headless: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("breathpacer=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut options = CliOptions::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--list-patterns" | "-l" => {
                list_patterns();
                return Ok(());
            }
            "--list-devices" => {
                list_devices();
                return Ok(());
            }
            "--version" | "-v" => {
                println!(
                    "breathpacer {} (built {})",
                    breathpacer::VERSION,
                    breathpacer::BUILD_DATE
                );
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--headless" | "-t" => options.headless = true,
            "--mute" | "-m" => options.mute = true,
            "--config" | "-c" => {
                let Some(path) = args.get(i + 1) else {
                    eprintln!("Error: --config requires a file path");
                    return Ok(());
                };
                options.config_path = Some(PathBuf::from(path));
                i += 2;
                continue;
            }
            "--preset" | "-p" => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("Error: --preset requires a number");
                    return Ok(());
                };
                match value.parse::<usize>() {
                    Ok(n) if (1..=PRESETS.len()).contains(&n) => options.preset = Some(n - 1),
                    _ => {
                        eprintln!(
                            "Error: Invalid preset: {} (expected 1-{})",
                            value,
                            PRESETS.len()
                        );
                        return Ok(());
                    }
                }
                i += 2;
                continue;
            }
            "--pattern" => {
                let Some(text) = args.get(i + 1) else {
                    eprintln!("Error: --pattern requires a value such as 4-7-8");
                    return Ok(());
                };
                if let Err(e) = Pattern::parse_custom(text) {
                    eprintln!("Error: Invalid pattern '{}': {}", text, e);
                    return Ok(());
                }
                options.pattern = Some(text.clone());
                i += 2;
                continue;
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                return Ok(());
            }
        }
        i += 1;
    }

    let config = resolve_config(&options);
    let synth = ToneSynthesizer::with_default_device(config.tone.clone());

    let result = if options.headless {
        headless::run(&config, synth)
    } else {
        BreathingApp::run(&config, synth)
    };
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

/// Load the config file and apply command-line overrides
fn resolve_config(options: &CliOptions) -> AppConfig {
    let path = options
        .config_path
        .clone()
        .unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&path);

    if let Some(preset) = options.preset {
        config.preset = preset;
        config.pattern = None;
    }
    if options.pattern.is_some() {
        config.pattern = options.pattern.clone();
    }
    if options.mute {
        config.sound_enabled = false;
    }
    config
}

fn print_help() {
    println!("Usage: breathpacer [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config PATH    Config file (default: breathpacer.json)");
    println!("  -p, --preset N       Start with predefined pattern N (see --list-patterns)");
    println!("      --pattern TEXT   Start with a custom pattern, e.g. 4-7-8");
    println!("  -m, --mute           Disable phase tones");
    println!("  -t, --headless       Run in the terminal instead of opening a window");
    println!("  -l, --list-patterns  List predefined patterns");
    println!("      --list-devices   List audio output devices");
    println!("  -v, --version        Show version");
    println!("  -h, --help           Show this help");
    println!();
    println!("Pattern format: inhale-hold-exhale-holdAfterExhale in seconds (0 skips a phase)");
    println!();
    println!("Environment:");
    println!("  RUST_LOG             Log filter (default: breathpacer=info)");
}

fn list_patterns() {
    println!("Predefined patterns:");
    println!("────────────────────────────────────────");
    for (i, preset) in PRESETS.iter().enumerate() {
        println!(
            "  {}. {:<16} {:<10} {}",
            i + 1,
            preset.name,
            preset.pattern.describe(),
            preset.description
        );
    }
}

fn list_devices() {
    println!("Audio output devices:");
    println!("────────────────────────────────────────");

    match AudioEngine::list_devices() {
        Ok(devices) if devices.is_empty() => {
            println!("  No output devices found.");
        }
        Ok(devices) => {
            for (i, device) in devices.iter().enumerate() {
                let default_marker = if device.is_default { " [default]" } else { "" };
                println!("  {}. {}{}", i + 1, device.name, default_marker);
                println!("     Channels: {}", device.output_channels);
                if !device.sample_rates.is_empty() {
                    let rates: Vec<String> =
                        device.sample_rates.iter().map(|r| r.to_string()).collect();
                    println!("     Sample rates: {} Hz", rates.join(", "));
                }
            }
        }
        Err(e) => {
            error!("Failed to list devices: {}", e);
            println!("Error: {}", e);
        }
    }
}

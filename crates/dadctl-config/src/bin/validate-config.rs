//! Config validation CLI tool
//!
//! Validates a dad-controller policy file and reports any errors.

use dadctl_config::ConfigError;
use dadctl_util::{ALL_WEEKDAYS, default_config_path, format_duration_compact};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a dad-controller policy file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match dadctl_config::load_config(&config_path) {
        Ok(policy) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!(
                "  Sampling interval: {}",
                format_duration_compact(policy.sampling_interval)
            );
            println!("  Rules: {}", policy.rules.len());

            for rule in &policy.rules {
                println!();
                println!(
                    "  - {} ({} patterns, {} scheduled days)",
                    rule.name,
                    rule.patterns().len(),
                    rule.scheduled_day_count()
                );
                for day in ALL_WEEKDAYS {
                    let Some(schedule) = rule.schedule_for(day) else {
                        continue;
                    };
                    let periods: Vec<String> = schedule
                        .allowed_periods
                        .iter()
                        .map(|w| format!("{:04}-{:04}", w.begin, w.end))
                        .collect();
                    println!(
                        "      {}: max {}, periods [{}]",
                        day,
                        format_duration_compact(schedule.max_duration),
                        periods.join(", ")
                    );
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                ConfigError::ParseError(parse_err) => {
                    eprintln!("JSON parse error:");
                    eprintln!("  {}", parse_err);
                }
                ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
            }
            ExitCode::from(1)
        }
    }
}

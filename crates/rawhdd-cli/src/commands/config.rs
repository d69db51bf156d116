//! Configuration file management command

use anyhow::{Context, Result};
use console::style;
use rawhdd_core::Settings;
use std::path::PathBuf;

/// Arguments for the config command
pub struct ConfigArgs {
    /// Initialize a new configuration file with defaults
    pub init: bool,
    /// Show the path to the configuration file
    pub path: bool,
    /// Show configuration in JSON format
    pub json: bool,
    /// Suppress output
    pub quiet: bool,
    /// Custom configuration file path (overrides default)
    pub config_file: Option<PathBuf>,
}

/// Execute the config command
pub fn execute(args: ConfigArgs) -> Result<()> {
    let config_path = args.config_file.clone().or_else(Settings::config_path);

    if args.path {
        if let Some(path) = &config_path {
            if !args.quiet {
                println!("{}", path.display());
            }
        } else if !args.quiet {
            eprintln!("{}", style("Could not determine config path").yellow());
        }
        return Ok(());
    }

    if args.init {
        return init_config(config_path, args.quiet);
    }

    show_config(config_path, args.json, args.quiet)
}

/// Initialize a new configuration file with default values
fn init_config(config_path: Option<PathBuf>, quiet: bool) -> Result<()> {
    let path = config_path.context("Could not determine configuration directory")?;

    if path.exists() {
        if !quiet {
            eprintln!(
                "{} Configuration file already exists at: {}",
                style("Warning:").yellow(),
                path.display()
            );
            eprintln!("Use a text editor to modify it, or delete it to re-initialize.");
        }
        return Ok(());
    }

    let saved_path = Settings::default()
        .save_to_path(Some(path))
        .context("Failed to save configuration file")?;

    if !quiet {
        println!(
            "{} Created configuration file at: {}",
            style("Success:").green(),
            saved_path.display()
        );
        println!();
        println!("You can edit this file to change the defaults, for example:");
        println!();
        println!("  [imaging]");
        println!("  log_file = \"/var/log/rawhdd.log\"");
        println!("  retry_attempts = 5");
        println!();
        println!("  [behavior]");
        println!("  skip_confirmation = false");
    }

    Ok(())
}

/// Show the current configuration
fn show_config(config_path: Option<PathBuf>, json: bool, quiet: bool) -> Result<()> {
    if quiet {
        return Ok(());
    }

    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());
    let settings = Settings::load_from_path(config_path.clone());

    if json {
        let json_output = serde_json::to_string_pretty(&settings)
            .context("Failed to serialize settings to JSON")?;
        println!("{}", json_output);
        return Ok(());
    }

    println!("{}", style("rawhdd Configuration").bold());
    println!();

    if let Some(path) = &config_path {
        if config_exists {
            println!("  {} {}", style("Config file:").dim(), path.display());
        } else {
            println!(
                "  {} {} {}",
                style("Config file:").dim(),
                path.display(),
                style("(not found, using defaults)").yellow()
            );
        }
    }
    println!();

    println!("{}", style("[imaging]").cyan());
    println!(
        "  log_file = \"{}\"",
        settings.imaging.log_file.display()
    );
    println!("  retry_attempts = {}", settings.imaging.retry_attempts);
    println!();

    println!("{}", style("[behavior]").cyan());
    println!(
        "  skip_confirmation = {}",
        settings.behavior.skip_confirmation
    );
    println!("  quiet = {}", settings.behavior.quiet);

    if !config_exists {
        println!();
        println!(
            "{}",
            style("Run 'rawhdd config --init' to create a configuration file.").dim()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawhdd_core::{BehaviorSettings, ImagingSettings};
    use tempfile::TempDir;

    fn args(dir: &TempDir) -> ConfigArgs {
        ConfigArgs {
            init: false,
            path: false,
            json: false,
            quiet: true,
            config_file: Some(dir.path().join("rawhdd_config.toml")),
        }
    }

    #[test]
    fn test_show_config_quiet() {
        assert!(show_config(None, false, true).is_ok());
        assert!(show_config(None, true, true).is_ok());
    }

    #[test]
    fn test_execute_path_flag() {
        let temp_dir = TempDir::new().unwrap();
        let result = execute(ConfigArgs {
            path: true,
            ..args(&temp_dir)
        });
        assert!(result.is_ok());
    }

    #[test]
    fn test_init_creates_default_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("rawhdd_config.toml");

        execute(ConfigArgs {
            init: true,
            ..args(&temp_dir)
        })
        .unwrap();

        assert!(config_path.exists());
        let loaded = Settings::load_from_path(Some(config_path));
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn test_init_keeps_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("rawhdd_config.toml");
        std::fs::write(&config_path, "[imaging]\nretry_attempts = 2\n").unwrap();

        execute(ConfigArgs {
            init: true,
            ..args(&temp_dir)
        })
        .unwrap();

        let loaded = Settings::load_from_path(Some(config_path));
        assert_eq!(loaded.imaging.retry_attempts, 2);
    }

    #[test]
    fn test_settings_json_serialization() {
        let settings = Settings {
            imaging: ImagingSettings {
                log_file: PathBuf::from("disk.log"),
                retry_attempts: 4,
            },
            behavior: BehaviorSettings {
                skip_confirmation: true,
                quiet: false,
            },
        };
        let json_str = serde_json::to_string_pretty(&settings).unwrap();
        assert!(json_str.contains("\"log_file\": \"disk.log\""));
        assert!(json_str.contains("\"retry_attempts\": 4"));
        assert!(json_str.contains("skip_confirmation"));
    }
}

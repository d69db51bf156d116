//! rawhdd - sector-for-sector hard disk imaging
//!
//! # Usage
//!
//! ```bash
//! # Show what the system reports about the first drive
//! rawhdd probe -d 0
//!
//! # Image the first drive into disk0.img
//! rawhdd image disk0.img
//!
//! # Image the second drive with an explicit geometry
//! rawhdd image -d 1 -c 615 -H 4 -s 17 disk1.img
//!
//! # Image a disk image or block device by path
//! rawhdd image --device /dev/sdb -c 1024 -H 16 -s 63 copy.img
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use clap_mangen::Man;
use console::style;
use rawhdd_core::{AbortHandle, MAX_DRIVE_INDEX};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod progress;

/// rawhdd - sector-for-sector hard disk imaging
#[derive(Parser)]
#[command(name = "rawhdd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy every sector of a drive into an image file
    Image {
        /// Destination image file (created or truncated)
        destination: PathBuf,

        /// Drive to image, counting from 0
        #[arg(
            short = 'd',
            long,
            default_value_t = 0,
            value_parser = clap::value_parser!(u8).range(0..=i64::from(MAX_DRIVE_INDEX))
        )]
        drive: u8,

        /// Override the cylinder count
        #[arg(short = 'c', long)]
        cylinders: Option<u32>,

        /// Override the head count
        #[arg(short = 'H', long)]
        heads: Option<u32>,

        /// Override sectors per track
        #[arg(short = 's', long)]
        sectors: Option<u32>,

        /// Read from this device or file instead of the drive's default path
        #[arg(long, value_name = "PATH")]
        device: Option<PathBuf>,

        /// Activity log file (appended to)
        #[arg(long, value_name = "FILE")]
        log: Option<PathBuf>,

        /// Retries for a sector that fails to read
        #[arg(long, value_name = "N")]
        retries: Option<u32>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show the geometry readings for a drive
    Probe {
        /// Drive to probe, counting from 0
        #[arg(
            short = 'd',
            long,
            default_value_t = 0,
            value_parser = clap::value_parser!(u8).range(0..=i64::from(MAX_DRIVE_INDEX))
        )]
        drive: u8,

        /// Query this device instead of the drive's default path
        #[arg(long, value_name = "PATH")]
        device: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show or initialise the configuration file
    Config {
        /// Create a configuration file with default values
        #[arg(long)]
        init: bool,

        /// Print the configuration file path
        #[arg(long)]
        path: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate man pages
    Mangen {
        /// Output directory for man pages
        #[arg(short, long, default_value = ".")]
        out_dir: String,
    },
}

fn main() {
    // Set up panic handler for nicer error messages
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("{} {}", style("Error:").red().bold(), panic_info);
    }));

    match run() {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);

            // Show cause chain in verbose mode
            if std::env::var("RUST_BACKTRACE").is_ok() {
                let mut source = e.source();
                while let Some(cause) = source {
                    eprintln!("  {} {}", style("Caused by:").yellow(), cause);
                    source = cause.source();
                }
            }

            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if cli.quiet {
        EnvFilter::new("off")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    // The first Ctrl+C stops imaging after the current unit; a second one
    // exits immediately
    let abort = AbortHandle::new();
    let handler_abort = abort.clone();
    ctrlc::set_handler(move || {
        if handler_abort.is_aborted() {
            eprintln!("\n{}", style("Forced exit").red().bold());
            std::process::exit(commands::image::EXIT_ABORTED);
        }
        handler_abort.abort();
        eprintln!(
            "\n{}",
            style("Stopping after the current sector... Press Ctrl+C again to force exit")
                .yellow()
        );
    })?;

    match cli.command {
        Commands::Image {
            destination,
            drive,
            cylinders,
            heads,
            sectors,
            device,
            log,
            retries,
            yes,
        } => {
            let status = commands::image::execute(commands::image::ImageArgs {
                destination,
                drive,
                cylinders,
                heads,
                sectors,
                device,
                log,
                retries,
                skip_confirm: yes,
                quiet: cli.quiet,
                abort,
            })?;
            Ok(status.exit_code())
        }
        Commands::Probe {
            drive,
            device,
            json,
        } => commands::probe::execute(drive, device, json).map(|()| 0),
        Commands::Config { init, path, json } => {
            commands::config::execute(commands::config::ConfigArgs {
                init,
                path,
                json,
                quiet: cli.quiet,
                config_file: None,
            })
            .map(|()| 0)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(0)
        }
        Commands::Mangen { out_dir } => {
            let cmd = Cli::command();
            let out_path = std::path::Path::new(&out_dir);
            std::fs::create_dir_all(out_path)?;

            // Generate main man page
            let man = Man::new(cmd.clone());
            let mut buffer = Vec::new();
            man.render(&mut buffer)?;
            std::fs::write(out_path.join("rawhdd.1"), buffer)?;
            if !cli.quiet {
                println!("Generated: {}/rawhdd.1", out_dir);
            }

            // Generate man pages for subcommands
            for subcommand in cmd.get_subcommands() {
                let name = subcommand.get_name();
                if subcommand.is_hide_set()
                    || name == "completions"
                    || name == "mangen"
                    || name == "help"
                {
                    continue;
                }

                let man = Man::new(subcommand.clone());
                let mut buffer = Vec::new();
                man.render(&mut buffer)?;
                let filename = format!("rawhdd-{}.1", name);
                std::fs::write(out_path.join(&filename), buffer)?;
                if !cli.quiet {
                    println!("Generated: {}/{}", out_dir, filename);
                }
            }

            Ok(0)
        }
    }
}

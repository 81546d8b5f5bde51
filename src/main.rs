use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use deskscan::config::{Config, load_config};
use deskscan::{Entry, Scanner, dirs, executor};
use regex::Regex;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan and print desktop entries
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        /// Scan only these directories
        #[arg(short, long = "dir")]
        dirs: Vec<PathBuf>,
    },
    /// Print the directories that would be scanned
    Dirs,
    /// Launch the first entry with the given name
    Run {
        name: String,

        /// Substituted for %f, %F, %u and %U
        #[arg(default_value = "")]
        args: String,
    },
}

fn scan_dirs(config: &Config) -> Vec<PathBuf> {
    let mut scan_dirs = dirs::data_dirs();
    scan_dirs.extend(config.scan.extra_dirs.iter().cloned());
    scan_dirs
}

fn is_blacklisted(entry: &Entry, blacklist: &[Regex]) -> bool {
    blacklist.iter().any(|re| re.is_match(&entry.name))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    let scanner = Scanner::new(config.scan.options());

    match args.command {
        Commands::Dirs => {
            for dir in scan_dirs(&config) {
                println!("{}", dir.display());
            }
        }
        Commands::List { json, dirs } => {
            let dirs = if dirs.is_empty() { scan_dirs(&config) } else { dirs };
            let blacklist = config.filter.compile()?;
            let entries: Vec<Vec<Entry>> = scanner
                .scan(&dirs)?
                .into_iter()
                .map(|found| {
                    found
                        .into_iter()
                        .filter(|e| !is_blacklisted(e, &blacklist))
                        .collect()
                })
                .collect();

            if json {
                let listing: Vec<_> = dirs
                    .iter()
                    .zip(&entries)
                    .map(|(dir, found)| {
                        serde_json::json!({ "dir": dir.display().to_string(), "entries": found })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                for (dir, found) in dirs.iter().zip(&entries) {
                    println!("{} ({})", dir.display(), found.len());
                    for entry in found {
                        println!("  {:<12} {:<32} {}", entry.kind, entry.name, entry.exec);
                    }
                }
            }
        }
        Commands::Run { name, args: exec_args } => {
            let entries = scanner.scan(&scan_dirs(&config))?;
            let entry = entries
                .iter()
                .flatten()
                .find(|e| e.name.eq_ignore_ascii_case(&name))
                .ok_or_else(|| anyhow!("no desktop entry named '{}'", name))?;
            executor::execute(entry, &exec_args, &config)?;
        }
    }

    Ok(())
}

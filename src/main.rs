pub mod colorize;
pub mod config;
pub mod crs;
pub mod data;
pub mod pipeline;
pub mod render;
pub mod scene;
pub mod tooltip;
pub mod types;

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the clustered dataset to an interactive HTML map
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "path.json")]
        paths: PathBuf,
        #[arg(short, long, value_name = "FILE", default_value = "map.html")]
        output: PathBuf,
        /// Layer option override, e.g. `--set opacity=0.9`. Values are read as JSON.
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
        overrides: Vec<(String, Value)>,
    },
    /// Print columns, CRS and color distribution without writing a map
    Inspect {
        #[arg(short, long, value_name = "FILE", default_value = "path.json")]
        paths: PathBuf,
    },
}

fn parse_override(arg: &str) -> Result<(String, Value), String> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", arg))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", arg));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Render {
        paths: PathBuf::from("path.json"),
        output: PathBuf::from("map.html"),
        overrides: Vec::new(),
    });

    match command {
        Commands::Render {
            paths,
            output,
            overrides,
        } => {
            let overrides: Map<String, Value> = overrides.into_iter().collect();
            let summary = pipeline::run(&paths, &output, &overrides)?;
            println!(
                "Rendered {} records ({} colored, {} fallback) to {:?}",
                summary.records, summary.colors.matched, summary.colors.fallback, output
            );
        }
        Commands::Inspect { paths } => {
            let pipeline::Inputs { records, config } = pipeline::load(&paths)?;
            println!("Columns: {}", records.columns().join(", "));
            println!("CRS (input): {}", records.crs.as_deref().unwrap_or("none"));

            let (records, _) = pipeline::prepare(records, &config);
            println!("CRS (normalized): {}", records.crs.as_deref().unwrap_or("none"));

            let mut counts: BTreeMap<[u8; 4], usize> = BTreeMap::new();
            for record in &records.records {
                if let Some(color) = record.color {
                    *counts.entry(color.0).or_default() += 1;
                }
            }
            println!("Colors by '{}':", config.cluster_column);
            for (color, count) in counts {
                println!("  {:?}: {}", color, count);
            }
        }
    }

    Ok(())
}

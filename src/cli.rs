use crate::config::load_config;
use crate::ir::Layout;
use crate::routing::RouterManager;
use crate::routing_dump::write_routing_dump;
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "connroute", version, about = "Connector router for pre-laid-out diagrams")]
pub struct Args {
    /// Input layout (.json / .json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the routing dump. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Router config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long = "pretty")]
    pub pretty: bool,
}

pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())
        .with_context(|| format!("failed to load config {:?}", args.config))?;

    let input = read_input(args.input.as_deref())?;
    let mut layout = Layout::from_json(&input)?;
    info!(
        elements = layout.elements.len(),
        connections = layout.connections.len();
        "loaded layout"
    );

    let report = RouterManager::new(config).route(&mut layout);
    write_routing_dump(args.output.as_deref(), &layout, &report, args.pretty)?;
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

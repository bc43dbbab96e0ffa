//! tabquery - run SQL-subset queries over JSON files

use anyhow::{anyhow, Context, Result};
use clap::Parser as ClapParser;
use std::path::PathBuf;
use tabquery::{EngineConfig, JsonFileSource, QueryEngine};

/// tabquery - query JSON record files with SELECT ... FROM ... [WHERE ...]
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Query to run
    #[arg(short, long)]
    query: String,

    /// Read the table with this alias from a JSON file (alias=path)
    #[arg(short, long = "table", value_parser = parse_binding)]
    tables: Vec<(String, PathBuf)>,

    /// Directory relative table locators are resolved against
    #[arg(short = 'D', long)]
    dir: Option<PathBuf>,

    /// JSON file with engine options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Extra characters allowed in identifiers
    #[arg(long)]
    identifier_chars: Option<String>,

    /// Hand the FROM text to the source as one table name
    #[arg(long)]
    no_parse_from: bool,

    /// Pass WHERE through to the source without evaluating it
    #[arg(long)]
    no_parse_where: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn parse_binding(text: &str) -> Result<(String, PathBuf)> {
    let (alias, path) = text
        .split_once('=')
        .ok_or_else(|| anyhow!("expected alias=path, got '{}'", text))?;
    Ok((alias.trim().to_string(), PathBuf::from(path.trim())))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(chars) = args.identifier_chars {
        config.additional_identifier_chars = chars;
    }
    if args.no_parse_from {
        config.parse_from = false;
    }
    if args.no_parse_where {
        config.parse_where = false;
    }

    let mut source = JsonFileSource::new();
    if let Some(dir) = args.dir {
        source = source.with_base_dir(dir);
    }
    for (alias, path) in args.tables {
        source.bind(alias, path);
    }

    let engine = QueryEngine::new(config);
    let result = engine
        .query(&args.query, &source)
        .await
        .context("Query failed")?;
    println!("{}", result);

    Ok(())
}

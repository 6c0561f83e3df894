use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

use docvec::{Collection, CollectionOptions, GlobalConfig, LogConfig, LogLevel, VectorQuery};

/// Inspect and maintain docvec collections
#[derive(Parser, Debug)]
#[command(name = "docvec")]
#[command(about = "Inspect and maintain docvec collections", long_about = None)]
struct Args {
    /// Log level (debug, info, warn, error, fatal)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the schema and statistics of a collection
    Info { path: PathBuf },
    /// Print documents by primary key
    Fetch {
        path: PathBuf,
        #[arg(required = true)]
        pks: Vec<String>,
    },
    /// Run a dense vector query
    Query {
        path: PathBuf,
        /// Vector field to search
        #[arg(long)]
        field: String,
        /// Comma separated components, e.g. "0.1,0.2,0.3"
        #[arg(long)]
        vector: String,
        #[arg(long, default_value_t = 10)]
        topk: u32,
        #[arg(long, default_value = "")]
        filter: String,
        /// Include vector fields in the output
        #[arg(long)]
        include_vector: bool,
    },
    /// Delete every document matching a filter expression
    DeleteByFilter { path: PathBuf, filter: String },
    /// Rebuild every index of a collection
    Optimize {
        path: PathBuf,
        #[arg(long, default_value_t = 0)]
        concurrency: u32,
    },
}

fn parse_vector(text: &str) -> anyhow::Result<Vec<f32>> {
    text.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f32>().with_context(|| format!("invalid vector component `{}`", s)))
        .collect()
}

fn open(path: &Path, read_only: bool) -> anyhow::Result<Collection> {
    let options = if read_only {
        CollectionOptions::read_only()
    } else {
        CollectionOptions::default()
    };
    Collection::open(path, Some(options))
        .with_context(|| format!("failed to open collection at {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level: LogLevel = args.log_level.parse()?;
    docvec::init(GlobalConfig::default().with_log(LogConfig::console(level)))?;
    info!("docvec v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Info { path } => {
            let collection = open(&path, true)?;
            let out = json!({
                "path": collection.path()?,
                "schema": collection.schema()?,
                "stats": collection.stats()?,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Fetch { path, pks } => {
            let collection = open(&path, true)?;
            let schema = collection.schema()?;
            let found = collection.fetch(&pks)?;
            let docs: Vec<_> = pks
                .iter()
                .filter_map(|pk| found.get(pk))
                .map(|doc| doc.to_json(&schema))
                .collect();
            println!("{}", serde_json::to_string_pretty(&docs)?);
        }
        Command::Query {
            path,
            field,
            vector,
            topk,
            filter,
            include_vector,
        } => {
            let collection = open(&path, true)?;
            let schema = collection.schema()?;
            let mut query = VectorQuery::new(field).with_topk(topk).with_filter(filter);
            query.set_dense(&parse_vector(&vector)?);
            query.include_vector = include_vector;
            let hits: Vec<_> = collection
                .query(&query)?
                .iter()
                .map(|doc| doc.to_json(&schema))
                .collect();
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
        Command::DeleteByFilter { path, filter } => {
            let collection = open(&path, false)?;
            let before = collection.stats()?.doc_count;
            collection.delete_by_filter(&filter)?;
            collection.flush()?;
            let after = collection.stats()?.doc_count;
            println!("deleted {} documents", before - after);
        }
        Command::Optimize { path, concurrency } => {
            let collection = open(&path, false)?;
            collection.optimize(concurrency)?;
            println!("{}", collection.stats()?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vector() {
        assert_eq!(parse_vector("0.5, 1,-2").unwrap(), vec![0.5, 1.0, -2.0]);
        assert!(parse_vector("").unwrap().is_empty());
        assert!(parse_vector("1,x").is_err());
    }

    #[test]
    fn test_cli_parses_query() {
        let args = Args::try_parse_from([
            "docvec", "query", "/tmp/c", "--field", "v", "--vector", "1,2", "--topk", "3",
        ])
        .unwrap();
        match args.command {
            Command::Query { field, topk, .. } => {
                assert_eq!(field, "v");
                assert_eq!(topk, 3);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(args.log_level, "warn");
    }
}

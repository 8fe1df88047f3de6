// Copyright 2025 Bulkload Project Authors. Licensed under Apache-2.0.

//! Populate a columnar database from an event stream on standard input.

use anyhow::{Context, Result};
use bulkload::loader::MemoryLoader;
use bulkload::Decoder;
use clap::Parser;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter;
use tracing_subscriber::prelude::*;

/// bulkload: populate a columnar database from standard input.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Additional directories to search for schema include files.
    /// Multiple paths may be separated by ':'.
    #[clap(short = 'I', long = "include", value_delimiter = ':')]
    include: Vec<String>,

    /// Schema file to use. Multiple files may be separated by ':'.
    #[clap(short = 'S', long = "schema", value_delimiter = ':')]
    schema: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let fmt_layer = tracing_subscriber::fmt::layer().compact();
    let filter_layer =
        filter::EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let mut loader = MemoryLoader::new();
    for path in &args.include {
        loader.add_include_path(path);
    }
    for file in &args.schema {
        loader.add_schema_file(file);
    }

    let stdin = std::io::stdin();
    Decoder::new(stdin.lock(), &mut loader)
        .run()
        .context("load failed")?;

    info!(
        "load complete: {} tables, {} columns, {} rows, {} payload bytes",
        loader.table_count(),
        loader.column_count(),
        loader.row_count(),
        loader.payload_bytes()
    );
    Ok(())
}

pub mod cli;
pub mod config;
pub mod inference;
pub mod integrate;
pub mod interrupt;
pub mod io_utils;
pub mod join_index;
pub mod loader;
pub mod schema;
pub mod statement;
pub mod store;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info, warn};

use crate::{
    cli::{Cli, Commands, InferArgs, IntegrateArgs, LoadArgs, StoreArgs},
    config::{Config, LoadConfig},
    integrate::Integrator,
    interrupt::{Interrupt, is_interrupted},
    io_utils::InputFormat,
    loader::BulkLoader,
    statement::CreateTable,
    store::SqliteStore,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_integrate", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Load(args) => handle_load(&args),
        Commands::Integrate(args) => handle_integrate(&args),
        Commands::Infer(args) => handle_infer(&args),
    }
}

fn resolve_config(args: &StoreArgs) -> Result<Config> {
    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(database) = &args.database {
        config.database = database.clone();
    }
    Ok(config)
}

fn handle_load(args: &LoadArgs) -> Result<()> {
    let mut config = resolve_config(&args.store)?;
    let load = &mut config.load;
    if !args.inputs.is_empty() {
        load.input_files = args.inputs.clone();
    }
    if let Some(dir) = &args.input_dir {
        load.input_dir = dir.clone();
    }
    if let Some(threshold) = args.text_threshold {
        load.text_threshold = threshold;
    }
    load.skip_existing_tables |= args.skip_existing;

    let format = resolve_format(
        &config.load,
        args.delimiter,
        args.input_encoding.as_deref(),
    )?;

    let store = SqliteStore::open(&config.database)?;
    let interrupt = Interrupt::listen_for_ctrl_c()?;
    let loader = BulkLoader::new(&store, &config.load, &interrupt)?.with_format(format);
    match loader.load_all() {
        Ok(reports) => {
            let rows: usize = reports.iter().map(|r| r.rows_affected).sum();
            info!(
                "Loaded {} file(s), {rows} row(s) into {:?}",
                reports.len(),
                config.database
            );
            Ok(())
        }
        Err(err) if is_interrupted(&err) => {
            warn!("Keyboard interrupt received, aborting!");
            warn!("The rows of the last table may not have been committed.");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

fn handle_integrate(args: &IntegrateArgs) -> Result<()> {
    let config = resolve_config(&args.store)?;
    let store = SqliteStore::open(&config.database)?;
    let interrupt = Interrupt::listen_for_ctrl_c()?;
    let integrator = Integrator::new(&store, &config.integration, &interrupt);
    match integrator.run() {
        Ok(report) => {
            let matched: usize = report.catalogs.iter().map(|c| c.matched).sum();
            info!(
                "Integrated {matched} record(s) into {}",
                config.integration.integrated_table
            );
            Ok(())
        }
        Err(err) if is_interrupted(&err) => {
            warn!("Interrupted. Matches of the current catalog have not been committed.");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

fn handle_infer(args: &InferArgs) -> Result<()> {
    let config = Config::load_or_default(args.config.as_deref())?;
    let threshold = args.text_threshold.unwrap_or(config.load.text_threshold);
    let format = resolve_format(
        &config.load,
        args.delimiter,
        args.input_encoding.as_deref(),
    )?;
    info!(
        "Inferring schema of '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(format.delimiter_for(&args.input))
    );

    let table = loader::table_name_for(&args.input)?;
    let mut schema = schema::infer_schema(
        &args.input,
        &format,
        &config.load.null_markers,
        &Interrupt::new(),
    )
    .with_context(|| format!("Inferring schema from {:?}", args.input))?;
    let key = args
        .key
        .as_deref()
        .or(config.load.key_columns.get(&table).map(String::as_str));
    if let Some(key) = key {
        schema = schema.with_key_column(key)?;
    }

    let create = CreateTable::from_schema(&table, &schema, threshold);
    let rows = schema
        .columns
        .iter()
        .zip(&create.columns)
        .map(|(column, clause)| {
            vec![
                column.name.clone(),
                column.sql_type.to_string(),
                column.max_length.to_string(),
                clause.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    print!(
        "{}",
        table::render_table(&["column", "type", "max_length", "definition"], &rows)
    );
    println!();
    println!("{create}");

    if let Some(output) = &args.output {
        schema.save(output)?;
        info!(
            "Schema for {} column(s) written to {:?}",
            schema.columns.len(),
            output
        );
    }
    Ok(())
}

/// Input format from the config with command-line overrides applied.
fn resolve_format(
    load: &LoadConfig,
    delimiter: Option<u8>,
    encoding: Option<&str>,
) -> Result<InputFormat> {
    let encoding = encoding.or(load.input_encoding.as_deref());
    let delimiter = match delimiter {
        Some(delimiter) => Some(delimiter),
        None => load.delimiter_override()?,
    };
    InputFormat::new(delimiter, encoding)
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}

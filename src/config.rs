//! Run configuration.
//!
//! A [`Config`] is read from an optional YAML file; every field has a default,
//! so a file only needs to list what differs. Components receive the section
//! they need at construction time.

use std::{
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::{cli::parse_delimiter, inference::NullMarkers, io_utils::InputFormat};

pub const DEFAULT_TEXT_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// SQLite database file.
    pub database: PathBuf,
    pub load: LoadConfig,
    pub integration: IntegrationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("data_integration.db"),
            load: LoadConfig::default(),
            integration: IntegrationConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config file {path:?}"))
    }

    /// Loads `path` when given, the defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    pub input_dir: PathBuf,
    /// File names relative to `input_dir`, loaded in order.
    pub input_files: Vec<String>,
    /// Delimiter override (`tab`, `comma`, `|`, ...); by extension otherwise.
    pub delimiter: Option<String>,
    pub input_encoding: Option<String>,
    pub null_markers: NullMarkers,
    /// Strings at least this long are stored as `TEXT` instead of `varchar`.
    pub text_threshold: usize,
    /// Key column per table name; the first column when absent.
    pub key_columns: BTreeMap<String, String>,
    pub progress_interval: usize,
    pub skip_existing_tables: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            input_files: vec![
                "imdb_name_basics.tsv".to_string(),
                "imdb_title_basics.tsv".to_string(),
                "imdb_title_crew.tsv".to_string(),
                "imdb_title_ratings.tsv".to_string(),
                "netflix_titles.csv".to_string(),
                "amazon_prime_titles.csv".to_string(),
            ],
            delimiter: None,
            input_encoding: None,
            null_markers: NullMarkers::default(),
            text_threshold: DEFAULT_TEXT_THRESHOLD,
            key_columns: BTreeMap::new(),
            progress_interval: 10_000,
            skip_existing_tables: false,
        }
    }
}

impl LoadConfig {
    pub fn input_format(&self) -> Result<InputFormat> {
        InputFormat::new(self.delimiter_override()?, self.input_encoding.as_deref())
    }

    /// The configured delimiter override, parsed.
    pub fn delimiter_override(&self) -> Result<Option<u8>> {
        self.delimiter
            .as_deref()
            .map(parse_delimiter)
            .transpose()
            .map_err(|err| anyhow!("Invalid delimiter in configuration: {err}"))
    }

    pub fn input_paths(&self) -> Vec<PathBuf> {
        self.input_files
            .iter()
            .map(|file| self.input_dir.join(file))
            .collect()
    }
}

/// The catalog the sources are matched against, spread over a titles table
/// and a ratings table sharing the id column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferenceCatalog {
    pub titles_table: String,
    pub ratings_table: String,
    pub id_column: String,
    pub primary_title_column: String,
    pub original_title_column: String,
    pub year_column: String,
    pub rating_column: String,
    /// Name of the materialized join index table.
    pub index_table: String,
}

impl Default for ReferenceCatalog {
    fn default() -> Self {
        Self {
            titles_table: "imdb_title_basics".to_string(),
            ratings_table: "imdb_title_ratings".to_string(),
            id_column: "tconst".to_string(),
            primary_title_column: "primaryTitle".to_string(),
            original_title_column: "originalTitle".to_string(),
            year_column: "startYear".to_string(),
            rating_column: "averageRating".to_string(),
            index_table: "temp_imdb_ratings".to_string(),
        }
    }
}

/// A source catalog walked by the integrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceCatalog {
    pub table: String,
    pub id_column: String,
    pub title_column: String,
    pub year_column: String,
    /// Tag stored with every match from this catalog.
    pub source: String,
}

impl SourceCatalog {
    pub fn new(table: &str, source: &str) -> Self {
        Self {
            table: table.to_string(),
            id_column: "show_id".to_string(),
            title_column: "title".to_string(),
            year_column: "release_year".to_string(),
            source: source.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegrationConfig {
    pub reference: ReferenceCatalog,
    pub catalogs: Vec<SourceCatalog>,
    pub integrated_table: String,
    pub progress_interval: usize,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            reference: ReferenceCatalog::default(),
            catalogs: vec![
                SourceCatalog::new("netflix_titles", "netflix"),
                SourceCatalog::new("amazon_prime_titles", "prime"),
            ],
            integrated_table: "rated_movies".to_string(),
            progress_interval: 100,
        }
    }
}

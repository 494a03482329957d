#![allow(dead_code)]

use std::cell::RefCell;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use csv_integrate::{
    interrupt::Interrupt,
    store::{RowSource, RowStream, SqliteStore, StatementExecutor},
};
use tempfile::{TempDir, tempdir};

pub const TITLE_BASICS: &str = "tconst\ttitleType\tprimaryTitle\toriginalTitle\tstartYear\n\
tt1375666\tmovie\tInception\tInception\t2010\n\
tt0245429\tmovie\tSpirited Away\tSen to Chihiro no kamikakushi\t2001\n\
tt0240772\tmovie\tOcean's Eleven\tOcean's Eleven\t2001\n\
tt0000001\tshort\tUntitled\tUntitled\t\\N\n";

pub const TITLE_RATINGS: &str = "tconst\taverageRating\tnumVotes\n\
tt1375666\t8.8\t2300000\n\
tt0245429\t8.6\t800000\n\
tt0240772\t7.7\t600000\n";

pub const NETFLIX_TITLES: &str = "show_id,type,title,release_year\n\
s1,Movie,Inception,2010\n\
s2,Movie,Inception,2011\n\
s3,Movie,Sen to Chihiro no kamikakushi,2001\n";

pub const PRIME_TITLES: &str = "show_id,type,title,release_year\n\
p1,Movie,Ocean's Eleven,2001\n\
p2,Movie,Unknown Picture,1999\n";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes the four catalog files used by the integration scenarios.
    pub fn write_catalogs(&self) -> Vec<String> {
        let files = [
            ("imdb_title_basics.tsv", TITLE_BASICS),
            ("imdb_title_ratings.tsv", TITLE_RATINGS),
            ("netflix_titles.csv", NETFLIX_TITLES),
            ("amazon_prime_titles.csv", PRIME_TITLES),
        ];
        files
            .iter()
            .map(|(name, contents)| {
                self.write(name, contents);
                name.to_string()
            })
            .collect()
    }
}

/// Executor that records statements instead of running them.
#[derive(Default)]
pub struct RecordingExecutor {
    pub statements: RefCell<Vec<String>>,
    pub commits: RefCell<usize>,
    /// Statements containing this text fail.
    pub fail_on: Option<String>,
}

impl RecordingExecutor {
    pub fn failing_on(fragment: &str) -> Self {
        Self {
            fail_on: Some(fragment.to_string()),
            ..Self::default()
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.borrow().clone()
    }

    pub fn inserts(&self) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|statement| statement.starts_with("INSERT"))
            .collect()
    }
}

impl StatementExecutor for RecordingExecutor {
    fn execute(&self, statement: &str) -> Result<usize> {
        if let Some(fragment) = &self.fail_on
            && statement.contains(fragment.as_str())
        {
            return Err(anyhow!("rejected: {statement}"));
        }
        self.statements.borrow_mut().push(statement.to_string());
        Ok(1)
    }

    fn commit(&self) -> Result<()> {
        *self.commits.borrow_mut() += 1;
        Ok(())
    }

    fn table_exists(&self, _table: &str) -> Result<bool> {
        Ok(false)
    }
}

/// SQLite store that raises an interrupt once a statement or query mentions
/// `trigger`, simulating Ctrl-C in the middle of a run.
pub struct InterruptingStore {
    pub inner: SqliteStore,
    pub interrupt: Interrupt,
    trigger: String,
}

impl InterruptingStore {
    pub fn new(inner: SqliteStore, trigger: &str) -> Self {
        Self {
            inner,
            interrupt: Interrupt::new(),
            trigger: trigger.to_string(),
        }
    }

    fn observe(&self, text: &str) {
        if text.contains(self.trigger.as_str()) {
            self.interrupt.trigger();
        }
    }
}

impl StatementExecutor for InterruptingStore {
    fn execute(&self, statement: &str) -> Result<usize> {
        self.observe(statement);
        self.inner.execute(statement)
    }

    fn commit(&self) -> Result<()> {
        self.inner.commit()
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        self.inner.table_exists(table)
    }
}

impl RowSource for InterruptingStore {
    fn stream_rows<T, F>(&self, query: &str, consume: F) -> Result<T>
    where
        F: FnOnce(RowStream<'_>) -> Result<T>,
    {
        self.observe(query);
        self.inner.stream_rows(query, consume)
    }
}

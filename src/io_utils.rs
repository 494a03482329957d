//! Reading delimited input files.
//!
//! Every tabular file enters the crate through [`InputFormat::open`], which
//! resolves the delimiter from the file extension (`.tsv` → tab, anything else
//! → comma) unless one was configured explicitly, decodes fields with the
//! configured `encoding_rs` encoding (UTF-8 by default), and consumes the
//! header line up front.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow, ensure};
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Delimiter and encoding used to read input files.
#[derive(Debug, Clone, Copy)]
pub struct InputFormat {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl InputFormat {
    pub fn new(delimiter: Option<u8>, encoding_label: Option<&str>) -> Result<Self> {
        Ok(Self {
            delimiter,
            encoding: resolve_encoding(encoding_label)?,
        })
    }

    pub fn delimiter_for(&self, path: &Path) -> u8 {
        resolve_input_delimiter(path, self.delimiter)
    }

    pub fn open(&self, path: &Path) -> Result<TabularReader<BufReader<File>>> {
        let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
        TabularReader::new(BufReader::new(file), self.delimiter_for(path), self.encoding)
            .with_context(|| format!("Reading header of {path:?}"))
    }
}

/// Header-aware reader yielding decoded rows one at a time.
pub struct TabularReader<R: Read> {
    inner: csv::Reader<R>,
    encoding: &'static Encoding,
    headers: Vec<String>,
    record: csv::ByteRecord,
    rows_read: usize,
}

impl<R: Read> TabularReader<R> {
    pub fn new(reader: R, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let mut inner = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .double_quote(true)
            .flexible(false)
            .from_reader(reader);
        let header_record = inner.byte_headers()?.clone();
        let headers = decode_record(&header_record, encoding)?;
        ensure!(
            !headers.is_empty() && !(headers.len() == 1 && headers[0].is_empty()),
            "Input has no header line"
        );
        Ok(Self {
            inner,
            encoding,
            headers,
            record: csv::ByteRecord::new(),
            rows_read: 0,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// File line the most recent row starts on, counting the header as line 1.
    pub fn line(&self) -> u64 {
        self.record
            .position()
            .map_or(self.rows_read as u64 + 1, |position| position.line())
    }

    pub fn next_row(&mut self) -> Result<Option<Vec<String>>> {
        let more = self
            .inner
            .read_byte_record(&mut self.record)
            .with_context(|| format!("Reading line {}", self.line()))?;
        if !more {
            return Ok(None);
        }
        self.rows_read += 1;
        let row = decode_record(&self.record, self.encoding)
            .with_context(|| format!("Decoding line {}", self.line()))?;
        Ok(Some(row))
    }
}

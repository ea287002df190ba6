//! Labeled record sources for training
//!
//! CSV files use the header `amount,category,transaction_type,is_fraud`.
//! SQLite tables carry the same four columns. Rows with an unreadable label
//! are skipped and logged; a bad amount only drops the amount.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{LabeledRecord, TransactionRecord};

pub const DEFAULT_TABLE: &str = "transactions";

/// Anything that can produce labeled training records
pub trait RecordSource {
    fn load_labeled(&self) -> Result<Vec<LabeledRecord>>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Parse a fraud label: 1/0, true/false, t/f, yes/no (case-insensitive)
pub fn parse_label(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" => Some(true),
        "0" | "false" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    amount: Option<String>,
    category: Option<String>,
    transaction_type: Option<String>,
    is_fraud: Option<String>,
}

/// CSV file with a header row
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read labeled records from any CSV reader
    pub fn read<R: Read>(reader: R) -> Result<Vec<LabeledRecord>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        for required in ["amount", "is_fraud"] {
            if !headers.iter().any(|h| h == required) {
                return Err(Error::InvalidData(format!(
                    "CSV header is missing the '{}' column",
                    required
                )));
            }
        }

        let mut records = Vec::new();
        let mut skipped = 0;
        for (i, result) in rdr.deserialize::<CsvRow>().enumerate() {
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    warn!(row = i + 2, error = %e, "Skipping malformed CSV row");
                    skipped += 1;
                    continue;
                }
            };

            let Some(is_fraud) = row.is_fraud.as_deref().and_then(parse_label) else {
                warn!(row = i + 2, label = ?row.is_fraud, "Skipping CSV row without a usable label");
                skipped += 1;
                continue;
            };

            let record = TransactionRecord::from_raw(
                row.amount.as_deref(),
                non_empty(row.category.as_deref()),
                non_empty(row.transaction_type.as_deref()),
            );
            records.push(LabeledRecord::new(record, is_fraud));
        }

        debug!("Parsed {} labeled CSV rows ({} skipped)", records.len(), skipped);
        Ok(records)
    }
}

impl RecordSource for CsvSource {
    fn load_labeled(&self) -> Result<Vec<LabeledRecord>> {
        let file = File::open(&self.path)?;
        Self::read(file)
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

/// SQLite table with `amount`, `category`, `transaction_type`, `is_fraud`
pub struct SqliteSource {
    location: SqliteLocation,
    table: String,
}

enum SqliteLocation {
    Path(PathBuf),
    Connection(Connection),
}

impl SqliteSource {
    /// Open a database file read-only when loading
    pub fn open(path: impl Into<PathBuf>, table: Option<&str>) -> Result<Self> {
        Ok(Self {
            location: SqliteLocation::Path(path.into()),
            table: validate_table(table.unwrap_or(DEFAULT_TABLE))?,
        })
    }

    /// Read from an already-open connection
    pub fn from_connection(conn: Connection, table: Option<&str>) -> Result<Self> {
        Ok(Self {
            location: SqliteLocation::Connection(conn),
            table: validate_table(table.unwrap_or(DEFAULT_TABLE))?,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn query(&self, conn: &Connection) -> Result<Vec<LabeledRecord>> {
        let sql = format!(
            "SELECT amount, category, transaction_type, is_fraud FROM \"{}\"",
            self.table
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, Value>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Value>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        let mut skipped = 0;
        for (i, row) in rows.enumerate() {
            let (amount, category, transaction_type, label) = row?;

            let Some(is_fraud) = label_from_value(&label) else {
                warn!(row = i + 1, table = %self.table, "Skipping row without a usable label");
                skipped += 1;
                continue;
            };

            let mut record = TransactionRecord::from_raw(
                None,
                non_empty(category.as_deref()),
                non_empty(transaction_type.as_deref()),
            );
            record.amount = match amount {
                Value::Real(v) => Some(v),
                Value::Integer(v) => Some(v as f64),
                Value::Text(text) => {
                    TransactionRecord::from_raw(Some(text.as_str()), None, None).amount
                }
                Value::Null => None,
                Value::Blob(_) => {
                    warn!(row = i + 1, "Binary amount, defaulting to 0");
                    None
                }
            };
            records.push(LabeledRecord::new(record, is_fraud));
        }

        debug!(
            "Read {} labeled rows from table {} ({} skipped)",
            records.len(),
            self.table,
            skipped
        );
        Ok(records)
    }
}

impl RecordSource for SqliteSource {
    fn load_labeled(&self) -> Result<Vec<LabeledRecord>> {
        match &self.location {
            SqliteLocation::Path(path) => {
                let conn = Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )?;
                self.query(&conn)
            }
            SqliteLocation::Connection(conn) => self.query(conn),
        }
    }

    fn describe(&self) -> String {
        match &self.location {
            SqliteLocation::Path(path) => format!("sqlite:{}#{}", path.display(), self.table),
            SqliteLocation::Connection(_) => format!("sqlite:<connection>#{}", self.table),
        }
    }
}

fn label_from_value(value: &Value) -> Option<bool> {
    match value {
        Value::Integer(0) => Some(false),
        Value::Integer(1) => Some(true),
        Value::Real(v) if *v == 0.0 => Some(false),
        Value::Real(v) if *v == 1.0 => Some(true),
        Value::Text(text) => parse_label(text),
        _ => None,
    }
}

fn validate_table(name: &str) -> Result<String> {
    let valid = !name.is_empty()
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name.to_string())
    } else {
        Err(Error::Config(format!("invalid table name: {:?}", name)))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc::error::SendError, oneshot::error::RecvError};

pub mod calculator;
pub mod channel_actor;
pub mod config;
pub mod evaluation;

#[derive(Error, Debug)]
pub enum ReimburseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV parsing error: {0}")]
    CsvAsync(#[from] csv_async::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to start calculator `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {name} `{value}`: {message}")]
    InvalidArgument {
        name: &'static str,
        value: String,
        message: String,
    },

    #[error("Expected {expected} arguments, found {found}")]
    ArgumentCount { expected: usize, found: usize },

    #[error("Calculator exited with code {exit_code}: {stderr}")]
    CalculatorFailed { exit_code: i32, stderr: String },

    #[error("Calculator printed a non-numeric amount: `{output}`")]
    InvalidOutput { output: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Actor send error: {0}")]
    ActorTxSendError(String),

    #[error("Actor recv error: {0}")]
    ActorRecvError(String),

    #[error("Unsupported case file `{path}`; expected .json or .csv")]
    UnsupportedFormat { path: String },

    #[error("Fatal Actor error; Exit")]
    FatalError,
}

pub fn map_channel_send_err<M>(err: SendError<M>) -> ReimburseError {
    let e = format!("{}", err);
    ReimburseError::ActorTxSendError(e)
}

pub fn map_channel_recv_err(err: RecvError) -> ReimburseError {
    let e = format!("{}", err);
    ReimburseError::ActorRecvError(e)
}

pub type ReimburseResult<T> = std::result::Result<T, ReimburseError>;

/// The three inputs of a single reimbursement request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub trip_duration_days: i64,
    pub miles_traveled: Decimal,
    pub total_receipts_amount: Decimal,
}

impl Trip {
    pub fn new(trip_duration_days: i64, miles_traveled: Decimal, total_receipts_amount: Decimal) -> Self {
        Self {
            trip_duration_days,
            miles_traveled,
            total_receipts_amount,
        }
    }

    /// Renders the trip as positional arguments, in invocation order.
    pub fn to_args(&self) -> [String; 3] {
        [
            self.trip_duration_days.to_string(),
            self.miles_traveled.to_string(),
            self.total_receipts_amount.to_string(),
        ]
    }
}

impl fmt::Display for Trip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}d, {}mi, ${}",
            self.trip_duration_days, self.miles_traveled, self.total_receipts_amount
        )
    }
}

/// A trip paired with the reimbursement it is known to produce.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub input: Trip,
    pub expected_output: Decimal,
}

/// Flat row layout used for CSV case files.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct CaseRecord {
    pub trip_duration_days: i64,
    pub miles_traveled: Decimal,
    pub total_receipts_amount: Decimal,
    pub expected_output: Decimal,
}

impl From<CaseRecord> for Case {
    fn from(record: CaseRecord) -> Self {
        Case {
            input: Trip::new(
                record.trip_duration_days,
                record.miles_traveled,
                record.total_receipts_amount,
            ),
            expected_output: record.expected_output,
        }
    }
}

/// A streaming CSV reader over case rows
pub struct CsvStreamReader<R>
where
    R: tokio::io::AsyncRead + Unpin + Send,
{
    pub reader: csv_async::AsyncDeserializer<R>,
}

impl<R> CsvStreamReader<R>
where
    R: tokio::io::AsyncRead + Unpin + Send,
{
    pub fn new(source: R) -> Self {
        let reader = csv_async::AsyncReaderBuilder::new()
            .trim(csv_async::Trim::All)
            .create_deserializer(source);
        Self { reader }
    }
}

/// A CSV writer for per-case predictions
pub struct CsvStreamWriter<W: std::io::Write> {
    pub writer: csv::Writer<W>,
}

impl<W: std::io::Write> CsvStreamWriter<W> {
    pub fn new(sink: W) -> Self {
        let writer = csv::WriterBuilder::new().has_headers(true).from_writer(sink);
        Self { writer }
    }
}

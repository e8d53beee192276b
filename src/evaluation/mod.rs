use std::io::Read;
use std::path::Path;

use futures::StreamExt;
use log::info;
use rust_decimal::Decimal;

use crate::{Case, CaseRecord, CsvStreamReader, ReimburseError, ReimburseResult};

pub mod processor;
pub mod report;
pub(crate) mod scoring_actor;
pub mod stats;

pub use processor::CaseEvaluator;
pub use report::EvaluationReport;
pub use stats::DatasetSummary;

/// A case together with what the calculator made of it.
#[derive(Clone, Debug, PartialEq)]
pub struct CaseOutcome {
    /// Position of the case in the input file.
    pub index: usize,
    pub case: Case,
    pub actual: Result<Decimal, String>,
}

impl CaseOutcome {
    /// Absolute distance from the expected amount, when the run succeeded.
    pub fn error(&self) -> Option<Decimal> {
        self.actual
            .as_ref()
            .ok()
            .map(|actual| (*actual - self.case.expected_output).abs())
    }
}

/// Reads a JSON array of labelled cases.
pub fn read_cases_json<R: Read>(reader: R) -> ReimburseResult<Vec<Case>> {
    Ok(serde_json::from_reader(reader)?)
}

/// Reads labelled cases from a CSV stream with a header row.
pub async fn read_cases_csv<R>(mut stream: CsvStreamReader<R>) -> ReimburseResult<Vec<Case>>
where
    R: tokio::io::AsyncRead + Unpin + Send,
{
    let mut cases = Vec::new();
    let mut records = stream.reader.deserialize::<CaseRecord>();
    while let Some(record) = records.next().await {
        cases.push(record?.into());
    }
    Ok(cases)
}

/// Loads a case file, picking the format from its extension.
pub async fn load_cases(path: &Path) -> ReimburseResult<Vec<Case>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let cases = match extension.as_deref() {
        Some("json") => {
            let bytes = tokio::fs::read(path).await?;
            read_cases_json(bytes.as_slice())?
        }
        Some("csv") => {
            let file = tokio::fs::File::open(path).await?;
            read_cases_csv(CsvStreamReader::new(file)).await?
        }
        _ => {
            return Err(ReimburseError::UnsupportedFormat {
                path: path.display().to_string(),
            });
        }
    };

    info!("loaded {} cases from {}", cases.len(), path.display());
    Ok(cases)
}

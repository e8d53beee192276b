use std::ffi::OsString;
use std::io::Write;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::{ReimburseError, ReimburseResult, Trip};

pub mod builtin;
pub mod external;

pub use builtin::BuiltinCalculator;
pub use external::ExternalCalculator;

/// Everything a calculation routine produced for one invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Invocation {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

impl Invocation {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Writes the captured streams out byte for byte.
    pub fn relay<O: Write, E: Write>(&self, stdout: &mut O, stderr: &mut E) -> std::io::Result<()> {
        stdout.write_all(&self.stdout)?;
        stdout.flush()?;
        stderr.write_all(&self.stderr)?;
        stderr.flush()
    }
}

/// A calculation routine that turns the three trip arguments into a reimbursement.
pub trait Calculator: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> String;

    /// Runs the routine with the arguments exactly as given.
    fn invoke(&self, args: &[OsString]) -> ReimburseResult<Invocation>;

    /// Runs the routine for a trip and reads the amount it printed.
    fn reimbursement(&self, trip: &Trip) -> ReimburseResult<Decimal> {
        let args: Vec<OsString> = trip.to_args().into_iter().map(OsString::from).collect();
        let invocation = self.invoke(&args)?;

        if !invocation.success() {
            return Err(ReimburseError::CalculatorFailed {
                exit_code: invocation.exit_code,
                stderr: String::from_utf8_lossy(&invocation.stderr).trim().to_string(),
            });
        }

        parse_amount(&String::from_utf8_lossy(&invocation.stdout))
    }
}

/// Reads the amount printed by a routine, ignoring surrounding whitespace.
pub fn parse_amount(output: &str) -> ReimburseResult<Decimal> {
    let trimmed = output.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| ReimburseError::InvalidOutput {
            output: trimmed.to_string(),
        })
}

/// Formats an amount the way the reimbursement routines print it:
/// two decimal places at most, trailing zeros dropped, never an integer.
pub fn format_amount(amount: Decimal) -> String {
    let normalized = amount.round_dp(2).normalize();
    if normalized.scale() == 0 {
        format!("{}.0", normalized)
    } else {
        normalized.to_string()
    }
}

use std::fmt;

use rust_decimal::Decimal;

use crate::calculator::format_amount;

use super::CaseOutcome;

/// Accuracy of a calculator over a set of labelled cases.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationReport {
    pub calculator: String,
    pub total_cases: usize,
    pub successful_runs: usize,
    pub failed_runs: usize,
    /// Within one cent.
    pub exact_matches: usize,
    /// Within one dollar.
    pub close_matches: usize,
    pub within_10: usize,
    pub within_25: usize,
    pub average_error: Decimal,
    pub max_error: Decimal,
    /// Largest errors first.
    pub worst: Vec<CaseOutcome>,
    /// Index and message of each failed run.
    pub failures: Vec<(usize, String)>,
}

impl EvaluationReport {
    pub fn from_outcomes(calculator: impl Into<String>, outcomes: &[CaseOutcome], worst_count: usize) -> Self {
        let exact = Decimal::new(1, 2);
        let close = Decimal::ONE;
        let ten = Decimal::TEN;
        let twenty_five = Decimal::from(25);

        let mut report = Self {
            calculator: calculator.into(),
            total_cases: outcomes.len(),
            successful_runs: 0,
            failed_runs: 0,
            exact_matches: 0,
            close_matches: 0,
            within_10: 0,
            within_25: 0,
            average_error: Decimal::ZERO,
            max_error: Decimal::ZERO,
            worst: Vec::new(),
            failures: Vec::new(),
        };

        let mut total_error = Decimal::ZERO;
        let mut scored: Vec<(Decimal, &CaseOutcome)> = Vec::with_capacity(outcomes.len());

        for outcome in outcomes {
            let error = match (&outcome.actual, outcome.error()) {
                (Ok(_), Some(error)) => error,
                (Err(message), _) => {
                    report.failed_runs += 1;
                    report.failures.push((outcome.index, message.clone()));
                    continue;
                }
                (Ok(_), None) => continue,
            };

            report.successful_runs += 1;
            total_error += error;
            report.max_error = report.max_error.max(error);

            if error <= exact {
                report.exact_matches += 1;
            }
            if error <= close {
                report.close_matches += 1;
            }
            if error <= ten {
                report.within_10 += 1;
            }
            if error <= twenty_five {
                report.within_25 += 1;
            }
            scored.push((error, outcome));
        }

        if report.successful_runs > 0 {
            report.average_error = (total_error / Decimal::from(report.successful_runs)).round_dp(2);
        }

        scored.sort_by(|(a, left), (b, right)| b.cmp(a).then(left.index.cmp(&right.index)));
        report.worst = scored
            .into_iter()
            .take(worst_count)
            .map(|(_, outcome)| outcome.clone())
            .collect();

        report
    }

    pub fn exact_rate(&self) -> Decimal {
        percentage(self.exact_matches, self.total_cases)
    }

    pub fn close_rate(&self) -> Decimal {
        percentage(self.close_matches, self.total_cases)
    }
}

fn percentage(part: usize, whole: usize) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole)).round_dp(1)
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EVALUATION: {} ===", self.calculator)?;
        writeln!(f, "Total cases: {}", self.total_cases)?;
        writeln!(f, "Successful runs: {}", self.successful_runs)?;
        writeln!(f, "Failed runs: {}", self.failed_runs)?;
        writeln!(f, "Exact matches (±$0.01): {} ({:.1}%)", self.exact_matches, self.exact_rate())?;
        writeln!(f, "Close matches (±$1.00): {} ({:.1}%)", self.close_matches, self.close_rate())?;
        writeln!(f, "Within $10: {}/{}", self.within_10, self.total_cases)?;
        writeln!(f, "Within $25: {}/{}", self.within_25, self.total_cases)?;
        writeln!(f, "Average error: ${}", format_amount(self.average_error))?;
        writeln!(f, "Maximum error: ${}", format_amount(self.max_error))?;

        if !self.worst.is_empty() {
            writeln!(f)?;
            writeln!(f, "Worst prediction errors:")?;
            for outcome in &self.worst {
                let actual = outcome.actual.as_ref().map(|a| format_amount(*a)).unwrap_or_default();
                let error = outcome.error().map(format_amount).unwrap_or_default();
                writeln!(
                    f,
                    "  case {}: {} → Expected: ${}, Got: ${}, Error: ${}",
                    outcome.index,
                    outcome.case.input,
                    format_amount(outcome.case.expected_output),
                    actual,
                    error
                )?;
            }
        }

        if !self.failures.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failed cases:")?;
            for (index, message) in &self.failures {
                writeln!(f, "  case {}: {}", index, message)?;
            }
        }

        Ok(())
    }
}

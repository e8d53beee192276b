use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;

use crate::Case;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range<T> {
    pub min: T,
    pub max: T,
}

impl<T: Ord + Copy> Range<T> {
    fn of(value: T) -> Self {
        Self { min: value, max: value }
    }

    fn widen(&mut self, value: T) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

fn widen<T: Ord + Copy>(range: &mut Option<Range<T>>, value: T) {
    match range {
        Some(range) => range.widen(value),
        None => *range = Some(Range::of(value)),
    }
}

/// Expected reimbursements for every case of one trip length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DurationSummary {
    pub count: usize,
    pub mean_output: Decimal,
    pub output: Range<Decimal>,
    /// Mean of `expected / days`; absent for non-positive lengths.
    pub mean_per_day_rate: Option<Decimal>,
}

/// Shape of a labelled case set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatasetSummary {
    pub count: usize,
    pub days: Option<Range<i64>>,
    pub miles: Option<Range<Decimal>>,
    pub receipts: Option<Range<Decimal>>,
    pub output: Option<Range<Decimal>>,
    pub by_duration: BTreeMap<i64, DurationSummary>,
}

impl DatasetSummary {
    pub fn from_cases(cases: &[Case]) -> Self {
        let mut summary = DatasetSummary {
            count: cases.len(),
            ..Default::default()
        };

        let mut groups: BTreeMap<i64, Vec<&Case>> = BTreeMap::new();
        for case in cases {
            let input = &case.input;
            widen(&mut summary.days, input.trip_duration_days);
            widen(&mut summary.miles, input.miles_traveled);
            widen(&mut summary.receipts, input.total_receipts_amount);
            widen(&mut summary.output, case.expected_output);
            groups.entry(input.trip_duration_days).or_default().push(case);
        }

        summary.by_duration = groups
            .into_iter()
            .filter_map(|(days, group)| Some((days, summarize_duration(days, &group)?)))
            .collect();

        summary
    }
}

fn summarize_duration(days: i64, group: &[&Case]) -> Option<DurationSummary> {
    let first = group.first()?;
    let count = Decimal::from(group.len());

    let mut output = Range::of(first.expected_output);
    let mut total = Decimal::ZERO;
    for case in group {
        output.widen(case.expected_output);
        total += case.expected_output;
    }

    let mean_output = (total / count).round_dp(2);
    let mean_per_day_rate = (days > 0).then(|| (total / count / Decimal::from(days)).round_dp(2));

    Some(DurationSummary {
        count: group.len(),
        mean_output,
        output,
        mean_per_day_rate,
    })
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== BASIC STATISTICS ===")?;
        writeln!(f, "Total cases: {}", self.count)?;
        if let Some(days) = &self.days {
            writeln!(f, "Days range: {} - {}", days.min, days.max)?;
        }
        if let Some(miles) = &self.miles {
            writeln!(f, "Miles range: {} - {}", miles.min, miles.max)?;
        }
        if let Some(receipts) = &self.receipts {
            writeln!(f, "Receipts range: ${:.2} - ${:.2}", receipts.min, receipts.max)?;
        }
        if let Some(output) = &self.output {
            writeln!(f, "Reimbursement range: ${:.2} - ${:.2}", output.min, output.max)?;
        }

        if !self.by_duration.is_empty() {
            writeln!(f)?;
            writeln!(f, "=== ANALYSIS BY TRIP DURATION ===")?;
            writeln!(f, "{:>5} {:>6} {:>10} {:>10} {:>10} {:>10}", "days", "count", "mean", "min", "max", "per day")?;
            for (days, group) in &self.by_duration {
                let per_day = group
                    .mean_per_day_rate
                    .map(|rate| format!("{:.2}", rate))
                    .unwrap_or_else(|| "-".to_string());
                writeln!(
                    f,
                    "{:>5} {:>6} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                    days, group.count, group.mean_output, group.output.min, group.output.max, per_day
                )?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Trip;
    use std::str::FromStr;

    fn case(days: i64, miles: &str, receipts: &str, expected: &str) -> Case {
        Case {
            input: Trip::new(
                days,
                Decimal::from_str(miles).unwrap(),
                Decimal::from_str(receipts).unwrap(),
            ),
            expected_output: Decimal::from_str(expected).unwrap(),
        }
    }

    #[test]
    fn ranges_cover_every_case() {
        let cases = vec![
            case(3, "93", "1.42", "364.51"),
            case(1, "55", "3.60", "126.06"),
            case(5, "130", "306.90", "574.10"),
        ];

        let summary = DatasetSummary::from_cases(&cases);

        assert_eq!(summary.count, 3);
        assert_eq!(summary.days, Some(Range { min: 1, max: 5 }));
        assert_eq!(summary.miles.unwrap().max, Decimal::from(130));
        assert_eq!(summary.receipts.unwrap().min, Decimal::from_str("1.42").unwrap());
        assert_eq!(summary.output.unwrap().min, Decimal::from_str("126.06").unwrap());
    }

    #[test]
    fn groups_by_trip_length() {
        let cases = vec![
            case(2, "10", "5", "200"),
            case(2, "20", "5", "300"),
            case(4, "10", "5", "500"),
        ];

        let summary = DatasetSummary::from_cases(&cases);
        let two_day = &summary.by_duration[&2];

        assert_eq!(summary.by_duration.len(), 2);
        assert_eq!(two_day.count, 2);
        assert_eq!(two_day.mean_output, Decimal::from(250));
        assert_eq!(two_day.output, Range { min: Decimal::from(200), max: Decimal::from(300) });
        assert_eq!(two_day.mean_per_day_rate, Some(Decimal::from(125)));
        assert_eq!(summary.by_duration[&4].mean_per_day_rate, Some(Decimal::from(125)));
    }

    #[test]
    fn zero_day_trips_have_no_per_day_rate() {
        let summary = DatasetSummary::from_cases(&[case(0, "10", "5", "20")]);
        assert_eq!(summary.by_duration[&0].mean_per_day_rate, None);
    }

    #[test]
    fn empty_cases_have_no_ranges() {
        let summary = DatasetSummary::from_cases(&[]);

        assert_eq!(summary, DatasetSummary::default());
        assert!(summary.to_string().contains("Total cases: 0"));
    }
}

use std::ffi::OsString;
use std::fmt;
use std::str::FromStr;

use log::debug;
use rust_decimal::Decimal;

use crate::{ReimburseError, ReimburseResult, Trip};

use super::{Calculator, Invocation};

pub const USAGE: &str =
    "Usage: reimburse <trip_duration_days> <miles_traveled> <total_receipts_amount>";

/// The in-process reimbursement formula.
///
/// Arithmetic is done in `f64` in the same order as the original routine, so
/// the printed amount matches it to the last digit, including where a binary
/// value sits just below a half cent.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinCalculator;

impl BuiltinCalculator {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, args: &[OsString]) -> ReimburseResult<Reimbursement> {
        let inputs = parse_trip(args)?;
        let amount = calculate_reimbursement(&inputs);
        debug!("{} -> {}", inputs, amount);
        Ok(amount)
    }
}

impl Calculator for BuiltinCalculator {
    fn name(&self) -> String {
        "builtin".to_string()
    }

    fn invoke(&self, args: &[OsString]) -> ReimburseResult<Invocation> {
        if args.len() != 3 {
            return Ok(Invocation {
                stdout: format!("{}\n", USAGE).into_bytes(),
                stderr: Vec::new(),
                exit_code: 1,
            });
        }

        let invocation = match self.run(args) {
            Ok(amount) => Invocation {
                stdout: format!("{}\n", amount).into_bytes(),
                stderr: Vec::new(),
                exit_code: 0,
            },
            Err(e) => Invocation {
                stdout: Vec::new(),
                stderr: format!("error: {}\n", e).into_bytes(),
                exit_code: 1,
            },
        };
        Ok(invocation)
    }

    fn reimbursement(&self, trip: &Trip) -> ReimburseResult<Decimal> {
        calculate_reimbursement(&TripInputs::from_trip(trip)?).to_decimal()
    }
}

/// The three arguments as the formula consumes them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TripInputs {
    pub days: i64,
    pub miles: f64,
    pub receipts: f64,
}

impl TripInputs {
    pub fn new(days: i64, miles: f64, receipts: f64) -> Self {
        Self { days, miles, receipts }
    }

    /// Reads the amounts of a case the way they would arrive on the command line.
    pub fn from_trip(trip: &Trip) -> ReimburseResult<Self> {
        let [_, miles, receipts] = trip.to_args();
        Ok(Self::new(
            trip.trip_duration_days,
            parse_float("miles_traveled", miles)?,
            parse_float("total_receipts_amount", receipts)?,
        ))
    }
}

impl fmt::Display for TripInputs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}d, {}mi, ${}", self.days, self.miles, self.receipts)
    }
}

/// Parses the three positional arguments.
pub fn parse_trip(args: &[OsString]) -> ReimburseResult<TripInputs> {
    let [days, miles, receipts] = args else {
        return Err(ReimburseError::ArgumentCount {
            expected: 3,
            found: args.len(),
        });
    };

    Ok(TripInputs::new(
        parse_days(days)?,
        parse_float("miles_traveled", as_text("miles_traveled", miles)?)?,
        parse_float("total_receipts_amount", as_text("total_receipts_amount", receipts)?)?,
    ))
}

fn as_text(name: &'static str, value: &OsString) -> ReimburseResult<String> {
    value
        .to_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| ReimburseError::InvalidArgument {
            name,
            value: value.to_string_lossy().into_owned(),
            message: "not valid UTF-8".to_string(),
        })
}

fn parse_days(value: &OsString) -> ReimburseResult<i64> {
    let text = as_text("trip_duration_days", value)?;
    i64::from_str(&text).map_err(|e| ReimburseError::InvalidArgument {
        name: "trip_duration_days",
        value: text,
        message: e.to_string(),
    })
}

// Accepts `inf`, `nan` and exponents, like the original's float().
fn parse_float(name: &'static str, text: String) -> ReimburseResult<f64> {
    f64::from_str(text.trim()).map_err(|e| ReimburseError::InvalidArgument {
        name,
        value: text,
        message: e.to_string(),
    })
}

/// A computed amount.
///
/// The day floor is an integer and is printed without a fractional part when
/// it wins; every other result is a float.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Reimbursement {
    Whole(i128),
    Fractional(f64),
}

impl Reimbursement {
    fn as_f64(self) -> f64 {
        match self {
            Reimbursement::Whole(n) => n as f64,
            Reimbursement::Fractional(x) => x,
        }
    }

    /// The amount as a decimal; fails for `inf`, `nan` and values beyond its range.
    pub fn to_decimal(self) -> ReimburseResult<Decimal> {
        let text = match self {
            Reimbursement::Whole(n) => n.to_string(),
            Reimbursement::Fractional(x) if x.is_finite() => x.to_string(),
            Reimbursement::Fractional(x) => float_repr(x),
        };
        Decimal::from_str(&text).map_err(|_| ReimburseError::InvalidOutput { output: self.to_string() })
    }

    /// Rounds to cents with half-to-even on the exact binary value.
    pub fn round_cents(self) -> Self {
        match self {
            Reimbursement::Fractional(x) if x.is_finite() => {
                Reimbursement::Fractional(f64::from_str(&format!("{:.2}", x)).unwrap_or(x))
            }
            other => other,
        }
    }
}

impl fmt::Display for Reimbursement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Reimbursement::Whole(n) => write!(f, "{}", n),
            Reimbursement::Fractional(x) => f.write_str(&float_repr(*x)),
        }
    }
}

/// Shortest round-trip text of a float: positional between 1e-4 and 1e16,
/// exponent form (`1.5e+20`) outside, and always a fractional part otherwise.
pub fn float_repr(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let scientific = format!("{:e}", x);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if x != 0.0 && (exponent < -4 || exponent >= 16) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
    }

    let positional = x.to_string();
    if positional.contains('.') {
        positional
    } else {
        format!("{}.0", positional)
    }
}

/// Computes the reimbursement for a trip, rounded to cents.
pub fn calculate_reimbursement(inputs: &TripInputs) -> Reimbursement {
    let TripInputs { days, miles, receipts } = *inputs;
    let days_f = days as f64;

    let miles_per_day = if days > 0 { miles / days_f } else { 0.0 };
    let efficiency_bonus = if miles_per_day > 100.0 {
        (miles_per_day - 100.0) * 0.3
    } else {
        0.0
    };

    let receipts_per_day = if days > 0 { receipts / days_f } else { 0.0 };
    let receipt_multiplier = receipt_multiplier(receipts_per_day);
    let day_total = (days_multiplier(days) * days as i128) as f64;

    let total = day_total + receipt_multiplier * receipts + miles_component(miles) + efficiency_bonus;

    let minimum = days as i128 * 60;
    let mut amount = if (minimum as f64) > total {
        Reimbursement::Whole(minimum)
    } else {
        Reimbursement::Fractional(total)
    };

    let reasonable_max = (days as i128 * 300) as f64 + receipts * 1.5 + miles * 2.0;
    if reasonable_max < amount.as_f64() {
        amount = Reimbursement::Fractional(reasonable_max);
    }

    amount.round_cents()
}

fn receipt_multiplier(receipts_per_day: f64) -> f64 {
    if receipts_per_day > 300.0 {
        0.2
    } else if receipts_per_day > 150.0 {
        0.4
    } else if receipts_per_day < 50.0 {
        0.6
    } else {
        0.5
    }
}

fn days_multiplier(days: i64) -> i128 {
    match days {
        1 => 90,
        d if d > 10 => 65,
        _ => 75,
    }
}

fn miles_component(miles: f64) -> f64 {
    if miles > 500.0 {
        500.0 * 0.5 + (miles - 500.0) * 0.3
    } else {
        miles * 0.5
    }
}

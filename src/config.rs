use std::sync::Arc;

use log::debug;

use crate::calculator::{BuiltinCalculator, Calculator, ExternalCalculator};
use crate::{ReimburseError, ReimburseResult};

pub const CALCULATOR_ENV: &str = "REIMBURSE_CALCULATOR";
pub const ACTORS_ENV: &str = "REIMBURSE_ACTORS";
pub const BUFFER_ENV: &str = "REIMBURSE_BUFFER";

pub const DEFAULT_ACTOR_COUNT: usize = 4;
pub const DEFAULT_BUFFER_SIZE: usize = 20;

/// Runtime settings shared by both binaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// External calculator command line; `None` selects the builtin formula.
    pub calculator: Option<String>,
    pub actor_count: usize,
    pub buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            calculator: None,
            actor_count: DEFAULT_ACTOR_COUNT,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl Config {
    pub fn from_env() -> ReimburseResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> ReimburseResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let calculator = calculator_command(&lookup);
        let actor_count = match lookup(ACTORS_ENV) {
            Some(value) => parse_count(ACTORS_ENV, &value)?,
            None => defaults.actor_count,
        };
        let buffer_size = match lookup(BUFFER_ENV) {
            Some(value) => parse_count(BUFFER_ENV, &value)?,
            None => defaults.buffer_size,
        };

        let config = Self {
            calculator,
            actor_count,
            buffer_size,
        };
        debug!("loaded {:?}", config);
        Ok(config)
    }

    /// Only the calculator selection, ignoring the pool settings.
    ///
    /// The pass-through entry point uses this so that `REIMBURSE_ACTORS` and
    /// `REIMBURSE_BUFFER` cannot change its behavior.
    pub fn calculator_from_env() -> ReimburseResult<Arc<dyn Calculator>> {
        Self::calculator_from_lookup(|key| std::env::var(key).ok())
    }

    pub fn calculator_from_lookup<F>(lookup: F) -> ReimburseResult<Arc<dyn Calculator>>
    where
        F: Fn(&str) -> Option<String>,
    {
        Config {
            calculator: calculator_command(&lookup),
            ..Config::default()
        }
        .calculator()
    }

    /// The calculation routine this configuration selects.
    pub fn calculator(&self) -> ReimburseResult<Arc<dyn Calculator>> {
        match &self.calculator {
            Some(command_line) => Ok(Arc::new(ExternalCalculator::from_command_line(command_line)?)),
            None => Ok(Arc::new(BuiltinCalculator::new())),
        }
    }
}

fn calculator_command<F>(lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(CALCULATOR_ENV).filter(|value| !value.trim().is_empty())
}

pub fn parse_count(name: &str, value: &str) -> ReimburseResult<usize> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err(ReimburseError::Config {
            message: format!("{name} must be greater than zero"),
        }),
        Ok(count) => Ok(count),
        Err(e) => Err(ReimburseError::Config {
            message: format!("{name}=`{value}`: {e}"),
        }),
    }
}

use std::ffi::OsString;
use std::process::{Command, ExitStatus};

use log::{debug, warn};

use crate::{ReimburseError, ReimburseResult};

use super::{Calculator, Invocation};

/// A calculation routine living in another program.
///
/// Arguments are appended to the configured command line untouched; nothing is
/// parsed, trimmed or counted on the way through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalCalculator {
    program: OsString,
    leading_args: Vec<OsString>,
}

impl ExternalCalculator {
    pub fn new<P, I, A>(program: P, leading_args: I) -> Self
    where
        P: Into<OsString>,
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            program: program.into(),
            leading_args: leading_args.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds a calculator from a whitespace separated command line,
    /// e.g. `python3 calculate_reimbursement.py`.
    pub fn from_command_line(command_line: &str) -> ReimburseResult<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next().ok_or_else(|| ReimburseError::Config {
            message: "calculator command is empty".to_string(),
        })?;
        Ok(Self::new(program, parts))
    }

    pub fn program(&self) -> &OsString {
        &self.program
    }

    pub fn leading_args(&self) -> &[OsString] {
        &self.leading_args
    }
}

impl Calculator for ExternalCalculator {
    fn name(&self) -> String {
        let mut name = self.program.to_string_lossy().into_owned();
        for arg in &self.leading_args {
            name.push(' ');
            name.push_str(&arg.to_string_lossy());
        }
        name
    }

    fn invoke(&self, args: &[OsString]) -> ReimburseResult<Invocation> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args);
        cmd.args(args);

        debug!("running {} with {:?}", self.name(), args);
        let output = cmd.output().map_err(|source| ReimburseError::Spawn {
            program: self.program.to_string_lossy().into_owned(),
            source,
        })?;

        let exit_code = exit_code(output.status);
        if exit_code != 0 {
            warn!("{} exited with code {}", self.name(), exit_code);
        }

        Ok(Invocation {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code,
        })
    }
}

/// Maps a child's status to the code a shell would report for it.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

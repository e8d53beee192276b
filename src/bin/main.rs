use std::{env, ffi::OsString, io};

use log::{debug, error};
use reimburse::{calculator::Calculator, config::Config, ReimburseError};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();

    // The entry point is a pass-through: no parsing, no counting, no --help.
    // Whatever follows the program name goes to the calculator as-is.
    let args: Vec<OsString> = env::args_os().skip(1).collect();

    std::process::exit(run(&args));
}

fn run(args: &[OsString]) -> i32 {
    let calculator = match Config::calculator_from_env() {
        Ok(calculator) => calculator,
        Err(e) => {
            eprintln!("reimburse: {}", e);
            return 2;
        }
    };
    debug!("forwarding {} arguments to {}", args.len(), calculator.name());

    match calculator.invoke(args) {
        Ok(invocation) => {
            if let Err(e) = invocation.relay(&mut io::stdout().lock(), &mut io::stderr().lock()) {
                error!("failed to relay calculator output: {}", e);
                return 1;
            }
            invocation.exit_code
        }
        // Same codes a shell uses when it cannot run a command
        Err(ReimburseError::Spawn { program, source }) => {
            eprintln!("reimburse: {}: {}", program, source);
            match source.kind() {
                io::ErrorKind::PermissionDenied => 126,
                _ => 127,
            }
        }
        Err(e) => {
            eprintln!("reimburse: {}", e);
            1
        }
    }
}

use std::{error::Error, fs::File, num::NonZeroUsize, path::PathBuf};

use clap::Parser;
use log::info;
use reimburse::{
    calculator::Calculator,
    config::Config,
    evaluation::{self, processor::write_predictions, CaseEvaluator, DatasetSummary, EvaluationReport},
    CsvStreamWriter,
};

/// A struct to hold the command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about = "Scores a reimbursement calculator against labelled cases.", long_about = None)]
struct Cli {
    /// Labelled cases, as a JSON array or a CSV file.
    #[arg(value_name = "CASES")]
    cases: PathBuf,

    /// External calculator command line [default: $REIMBURSE_CALCULATOR, else builtin]
    #[arg(long, value_name = "CMD")]
    calculator: Option<String>,

    /// Number of scoring actors [default: $REIMBURSE_ACTORS, else 4]
    #[arg(long, value_name = "N")]
    actors: Option<NonZeroUsize>,

    /// Mailbox size of each scoring actor [default: $REIMBURSE_BUFFER, else 20]
    #[arg(long, value_name = "N")]
    buffer: Option<NonZeroUsize>,

    /// Write one CSV row per case to this file.
    #[arg(long, value_name = "PATH")]
    predictions: Option<PathBuf>,

    /// How many of the largest errors to list.
    #[arg(long, value_name = "N", default_value_t = 5)]
    worst: usize,

    /// Print dataset statistics before the report.
    #[arg(long)]
    stats: bool,
}

impl Cli {
    /// Environment settings with command-line flags on top.
    fn config(&self) -> Result<Config, Box<dyn Error>> {
        let mut config = Config::from_env()?;
        if let Some(command_line) = &self.calculator {
            config.calculator = Some(command_line.clone()).filter(|cmd| !cmd.trim().is_empty());
        }
        if let Some(actors) = self.actors {
            config.actor_count = actors.get();
        }
        if let Some(buffer) = self.buffer {
            config.buffer_size = buffer.get();
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = cli.config()?;
    let calculator = config.calculator()?;

    // The main function is only responsible for I/O and orchestration.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.actor_count)
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let cases = evaluation::load_cases(&cli.cases).await?;

        if cli.stats {
            println!("{}", DatasetSummary::from_cases(&cases));
        }

        let name = calculator.name();
        info!("scoring {} cases with {}", cases.len(), name);
        let mut evaluator = CaseEvaluator::new(config.actor_count, config.buffer_size, calculator).await;
        let outcomes = evaluator.evaluate(cases).await?;

        if let Some(path) = &cli.predictions {
            write_predictions(&outcomes, CsvStreamWriter::new(File::create(path)?))?;
            info!("wrote predictions to {}", path.display());
        }

        print!("{}", EvaluationReport::from_outcomes(name, &outcomes, cli.worst));
        Ok::<(), Box<dyn Error>>(())
    })?;

    Ok(())
}

use std::io::Write;
use std::sync::Arc;

use log::info;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::{
    calculator::Calculator,
    channel_actor::{self, ActorRef},
    Case, CsvStreamWriter, ReimburseResult,
};

use super::{
    scoring_actor::{ScoringActor, ScoringActorMessages},
    CaseOutcome,
};

/// Scores labelled cases against a calculator, spreading the work over a
/// fixed pool of scoring actors.
pub struct CaseEvaluator {
    actor_count: usize,
    scoring_actors: Vec<ActorRef<ScoringActorMessages>>,
}

impl CaseEvaluator {
    pub async fn new(actor_count: usize, channel_buffer_size: usize, calculator: Arc<dyn Calculator>) -> Self {
        let actor_count = actor_count.max(1);
        let mut scoring_actors = Vec::with_capacity(actor_count);
        for _ in 0..actor_count {
            let actor = ScoringActor::create(calculator.clone());
            let actor_ref = channel_actor::start(actor, channel_buffer_size.max(1)).await;
            scoring_actors.push(actor_ref);
        }

        Self {
            actor_count,
            scoring_actors,
        }
    }

    /// Hands every case to its actor; returns how many were sent.
    pub async fn process<I>(&mut self, cases: I) -> ReimburseResult<usize>
    where
        I: IntoIterator<Item = Case>,
    {
        let mut sent = 0;
        for (index, case) in cases.into_iter().enumerate() {
            let scoring_actor = &self.scoring_actors[index % self.actor_count];
            scoring_actor.tell(ScoringActorMessages::Score(index, case)).await?;
            sent += 1;
        }

        info!("queued {} cases on {} actors", sent, self.actor_count);
        Ok(sent)
    }

    /// Collects everything scored so far, ordered by case index.
    pub async fn outcomes(&mut self) -> ReimburseResult<Vec<CaseOutcome>> {
        let mut outcomes = Vec::new();
        for scoring_actor in &self.scoring_actors {
            let (tx, rx) = oneshot::channel();
            let mut part = scoring_actor.ask(ScoringActorMessages::Output(tx), rx).await?;
            outcomes.append(&mut part);
        }

        outcomes.sort_by_key(|outcome| outcome.index);
        Ok(outcomes)
    }

    pub async fn evaluate<I>(&mut self, cases: I) -> ReimburseResult<Vec<CaseOutcome>>
    where
        I: IntoIterator<Item = Case>,
    {
        self.process(cases).await?;
        self.outcomes().await
    }
}

#[derive(Debug, Serialize)]
struct PredictionRow {
    case: usize,
    trip_duration_days: i64,
    miles_traveled: Decimal,
    total_receipts_amount: Decimal,
    expected_output: Decimal,
    actual_output: Option<Decimal>,
    error: Option<Decimal>,
}

impl From<&CaseOutcome> for PredictionRow {
    fn from(outcome: &CaseOutcome) -> Self {
        let input = &outcome.case.input;
        Self {
            case: outcome.index,
            trip_duration_days: input.trip_duration_days,
            miles_traveled: input.miles_traveled,
            total_receipts_amount: input.total_receipts_amount,
            expected_output: outcome.case.expected_output,
            actual_output: outcome.actual.as_ref().ok().copied(),
            error: outcome.error(),
        }
    }
}

/// Writes one CSV row per outcome. Failed runs leave the last two columns empty.
pub fn write_predictions<W: Write>(outcomes: &[CaseOutcome], mut stream: CsvStreamWriter<W>) -> ReimburseResult<()> {
    for outcome in outcomes {
        stream.writer.serialize(PredictionRow::from(outcome))?;
    }
    stream.writer.flush()?;
    Ok(())
}

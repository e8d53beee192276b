use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::oneshot;

use crate::{calculator::Calculator, channel_actor::ChannelActor, Case, ReimburseResult};

use super::CaseOutcome;

#[derive(Debug)]
pub(crate) enum ScoringActorMessages {
    Score(usize, Case),
    Output(oneshot::Sender<Vec<CaseOutcome>>),
}

/// Runs the calculator for its share of the cases and keeps the outcomes.
pub(crate) struct ScoringActor {
    calculator: Arc<dyn Calculator>,
    outcomes: Vec<CaseOutcome>,
}

impl ScoringActor {
    pub(crate) fn create(calculator: Arc<dyn Calculator>) -> Self {
        Self {
            calculator,
            outcomes: Vec::new(),
        }
    }

    async fn score(&self, index: usize, case: &Case) -> Result<rust_decimal::Decimal, String> {
        let calculator = self.calculator.clone();
        let trip = case.input.clone();

        // External calculators block on a child process
        let joined = tokio::task::spawn_blocking(move || calculator.reimbursement(&trip)).await;

        match joined {
            Ok(Ok(amount)) => {
                debug!("case {}: {} -> {}", index, case.input, amount);
                Ok(amount)
            }
            Ok(Err(e)) => {
                warn!("case {}: {}", index, e);
                Err(e.to_string())
            }
            Err(e) => {
                warn!("case {}: calculator task failed: {}", index, e);
                Err(format!("calculator task failed: {e}"))
            }
        }
    }
}

#[async_trait::async_trait]
impl ChannelActor<ScoringActorMessages> for ScoringActor {
    async fn handle(&mut self, msg: ScoringActorMessages) -> ReimburseResult<()> {
        use ScoringActorMessages::*;

        match msg {
            Score(index, case) => {
                let actual = self.score(index, &case).await;
                self.outcomes.push(CaseOutcome { index, case, actual });
            }

            Output(sender) => {
                let _ = sender.send(std::mem::take(&mut self.outcomes));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::BuiltinCalculator;
    use crate::channel_actor;
    use crate::Trip;
    use rust_decimal::Decimal;

    fn case(days: i64, miles: i64, receipts: i64, expected: i64) -> Case {
        Case {
            input: Trip::new(days, Decimal::from(miles), Decimal::from(receipts)),
            expected_output: Decimal::from(expected),
        }
    }

    #[tokio::test]
    async fn output_drains_collected_outcomes() {
        let actor = channel_actor::start(ScoringActor::create(Arc::new(BuiltinCalculator::new())), 4).await;

        actor.tell(ScoringActorMessages::Score(0, case(1, 100, 20, 152))).await.unwrap();
        actor.tell(ScoringActorMessages::Score(2, case(2, 50, 400, 300))).await.unwrap();

        let (tx, rx) = oneshot::channel();
        let outcomes = actor.ask(ScoringActorMessages::Output(tx), rx).await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].actual, Ok(Decimal::from(152)));
        assert_eq!(outcomes[1].index, 2);
        assert_eq!(outcomes[1].error(), Some(Decimal::from(35)));

        let (tx, rx) = oneshot::channel();
        let drained = actor.ask(ScoringActorMessages::Output(tx), rx).await.unwrap();
        assert!(drained.is_empty());
    }
}

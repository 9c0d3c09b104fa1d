use log::debug;

use crate::data_structures::best_values_tracker::BestValuesTracker;
use crate::factor_types::factor_core::FactorCore;
use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::FactorResult;
use crate::maxsum::operator::Operator;

// When the condition neighbor is active exactly one of the others must be active, otherwise
// none of them may be. The condition must also be linked as a neighbor.
#[derive(Debug, Clone)]
pub struct ConditionedSelectorFactor<T> {
    core: FactorCore<T>,
    condition: T,
}

impl<T: Identity> ConditionedSelectorFactor<T> {
    pub fn new(identity: T, operator: Operator, condition: T) -> Self {
        ConditionedSelectorFactor {
            core: FactorCore::new(identity, operator),
            condition,
        }
    }

    pub fn condition(&self) -> &T {
        &self.condition
    }

    pub fn set_condition(&mut self, condition: T) {
        self.condition = condition;
    }

    fn dependents(&self) -> impl Iterator<Item = &T> + '_ {
        self.core
            .neighbors()
            .iter()
            .filter(move |neighbor| **neighbor != self.condition)
    }
}

impl<T: Identity> Factor<T> for ConditionedSelectorFactor<T> {
    fn core(&self) -> &FactorCore<T> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FactorCore<T> {
        &mut self.core
    }

    fn evaluate(&self, assignment: &Assignment<T>) -> FactorResult<f64> {
        let condition = self.core.is_active(assignment, &self.condition)?;
        let mut n_active = 0;
        for dependent in self.dependents() {
            if self.core.is_active(assignment, dependent)? {
                n_active += 1;
            }
        }

        match (condition, n_active) {
            (true, 1) | (false, 0) => Ok(0.),
            _ => Ok(self.core.operator().worst_value()),
        }
    }

    fn run(&mut self, adapter: &mut dyn CommunicationAdapter<T>) -> FactorResult<usize> {
        let operator = self.core.operator();
        let condition_message = self.core.message(&self.condition)?;

        let mut tracker = BestValuesTracker::new(operator);
        for dependent in self.dependents() {
            tracker.track(dependent.clone(), self.core.message(dependent)?);
        }

        self.core
            .send(tracker.best_value(), &self.condition, adapter)?;
        for dependent in self.dependents() {
            let message = -operator.max(tracker.complementary(dependent), -condition_message);
            self.core.send(message, dependent, adapter)?;
        }

        debug!(
            "Conditioned selector {:?} ran on condition {:?}",
            self.core.identity(),
            self.condition
        );
        Ok(2 * self.core.len())
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;
    use crate::factor_types::standard::StandardFactor;
    use crate::maxsum::errors::FactorError;
    use crate::testing::*;

    fn construct_factor(
        operator: Operator,
        condition: usize,
        n_neighbors: usize,
    ) -> ConditionedSelectorFactor<usize> {
        let mut factor = ConditionedSelectorFactor::new(TESTED, operator, condition);
        link(&mut factor, n_neighbors);
        factor
    }

    #[test]
    fn condition_receives_best_dependent() {
        // neighbor 0 is the condition
        let mut factor = construct_factor(Operator::Maximize, 0, 3);
        let sent = run_with_messages(&mut factor, &[-1., 2., 0.5]);
        // dependent 1: -max(0.5, 1) = -1, dependent 2: -max(2, 1) = -2
        assert_all_close(&sent, &[2., -1., -2.]);
    }

    #[test]
    fn evaluation_follows_condition() {
        let factor = construct_factor(Operator::Minimize, 1, 3);
        let on_one = Assignment::from([(0, true), (1, true), (2, false)]);
        let off_none = Assignment::from([(0, false), (1, false), (2, false)]);
        let off_one = Assignment::from([(0, true), (1, false), (2, false)]);
        assert_eq!(factor.evaluate(&on_one).unwrap(), 0.);
        assert_eq!(factor.evaluate(&off_none).unwrap(), 0.);
        assert_eq!(factor.evaluate(&off_one).unwrap(), f64::INFINITY);
    }

    #[test]
    fn unlinked_condition_is_an_error() {
        let mut factor = construct_factor(Operator::Maximize, 7, 2);
        let mut adapter = RecordingAdapter::new();
        assert!(matches!(
            factor.run(&mut adapter),
            Err(FactorError::InvalidNeighbor { .. })
        ));
    }

    #[test]
    fn matches_tabular_factor() {
        cross_check(18, |operator, n_neighbors, rng| {
            let condition = rng.random_range(0..n_neighbors);
            let specific = construct_factor(operator, condition, n_neighbors);

            let mut reference = StandardFactor::new(TESTED, operator);
            link(&mut reference, n_neighbors);
            reference.set_potential_fn(|active| {
                let n_dependents = active.count_ones() - usize::from(active[condition]);
                match (active[condition], n_dependents) {
                    (true, 1) | (false, 0) => 0.,
                    _ => operator.worst_value(),
                }
            });

            (specific.into(), reference.into())
        });
    }
}

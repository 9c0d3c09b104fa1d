use log::debug;

use crate::data_structures::best_values_tracker::BestValuesTracker;
use crate::factor_types::factor_core::FactorCore;
use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::FactorResult;
use crate::maxsum::operator::Operator;

// Gives `incentive` (a bonus or a penalty) only when every neighbor is active
#[derive(Debug, Clone)]
pub struct AllActiveIncentiveFactor<T> {
    core: FactorCore<T>,
    incentive: f64,
}

impl<T: Identity> AllActiveIncentiveFactor<T> {
    pub fn new(identity: T, operator: Operator, incentive: f64) -> Self {
        AllActiveIncentiveFactor {
            core: FactorCore::new(identity, operator),
            incentive,
        }
    }

    pub fn incentive(&self) -> f64 {
        self.incentive
    }

    pub fn set_incentive(&mut self, incentive: f64) {
        self.incentive = incentive;
    }
}

impl<T: Identity> Factor<T> for AllActiveIncentiveFactor<T> {
    fn core(&self) -> &FactorCore<T> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FactorCore<T> {
        &mut self.core
    }

    fn evaluate(&self, assignment: &Assignment<T>) -> FactorResult<f64> {
        let all_active = self.core.active_flags(assignment)?.into_iter().all(|a| a);
        Ok(if all_active { self.incentive } else { 0. })
    }

    fn run(&mut self, adapter: &mut dyn CommunicationAdapter<T>) -> FactorResult<usize> {
        let max = self.core.operator();
        let min = max.inverse();

        // Worst incoming message, and the sum of the messages that oppose activation
        let mut worst_messages = BestValuesTracker::new(min);
        let mut negative_sum = 0.;
        for neighbor in self.core.neighbors() {
            let message = self.core.message(neighbor)?;
            worst_messages.track(neighbor.clone(), message);
            negative_sum += min.max(0., message);
        }

        for neighbor in self.core.neighbors() {
            let message = self.core.message(neighbor)?;
            let negative_sum_i = negative_sum - min.max(0., message);
            let value = max.max(
                min.max(0., -worst_messages.complementary(neighbor)),
                self.incentive + negative_sum_i,
            );
            self.core.send(value, neighbor, adapter)?;
        }

        debug!(
            "All-active factor {:?} ran with incentive {}",
            self.core.identity(),
            self.incentive
        );
        Ok(2 * self.core.len())
    }
}

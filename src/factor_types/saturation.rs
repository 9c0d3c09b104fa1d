use std::cmp::Ordering;

use log::debug;

use crate::data_structures::best_values_tracker::BestValuesTracker;
use crate::factor_types::factor_core::FactorCore;
use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::factor_types::independent::IndependentFactor;
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::FactorResult;
use crate::maxsum::operator::Operator;

// Value is the best potential among the active neighbors (0 when none is active)
#[derive(Debug, Clone)]
pub struct SaturationFactor<T> {
    potentials: IndependentFactor<T>,
}

impl<T: Identity> SaturationFactor<T> {
    pub fn new(identity: T, operator: Operator) -> Self {
        SaturationFactor {
            potentials: IndependentFactor::new(identity, operator),
        }
    }

    pub fn potential(&self, neighbor: &T) -> FactorResult<f64> {
        self.potentials.potential(neighbor)
    }

    pub fn set_potential(&mut self, neighbor: &T, potential: f64) -> FactorResult<()> {
        self.potentials.set_potential(neighbor, potential)
    }
}

impl<T: Identity> Factor<T> for SaturationFactor<T> {
    fn core(&self) -> &FactorCore<T> {
        self.potentials.core()
    }

    fn core_mut(&mut self) -> &mut FactorCore<T> {
        self.potentials.core_mut()
    }

    fn add_neighbor(&mut self, neighbor: T) -> bool {
        self.potentials.add_neighbor(neighbor)
    }

    fn remove_neighbor(&mut self, neighbor: &T) -> bool {
        self.potentials.remove_neighbor(neighbor)
    }

    fn clear_neighbors(&mut self) {
        self.potentials.clear_neighbors()
    }

    fn evaluate(&self, assignment: &Assignment<T>) -> FactorResult<f64> {
        let core = self.core();
        let mut chosen = BestValuesTracker::new(core.operator());
        for neighbor in core.neighbors() {
            if core.is_active(assignment, neighbor)? {
                chosen.track(neighbor.clone(), self.potential(neighbor)?);
            }
        }
        Ok(match chosen.best() {
            Some(_) => chosen.best_value(),
            None => 0.,
        })
    }

    fn run(&mut self, adapter: &mut dyn CommunicationAdapter<T>) -> FactorResult<usize> {
        let core = self.potentials.core();
        let operator = core.operator();

        // Best potential, where neighbors that would rather stay inactive pay their message
        let mut max_b = BestValuesTracker::new(operator);
        let mut positive_sum = 0.;
        for neighbor in core.neighbors() {
            let v_i = core.message(neighbor)?;
            let b_i = self.potential(neighbor)?;

            positive_sum += operator.max(v_i, 0.);
            if operator.compare(v_i, 0.) != Ordering::Less {
                max_b.track(neighbor.clone(), b_i);
            } else {
                max_b.track(neighbor.clone(), b_i + v_i);
            }
        }

        for neighbor in core.neighbors() {
            let v_i = core.message(neighbor)?;
            let b_i = self.potential(neighbor)?;

            let max_b_i = max_b.complementary(neighbor);
            let positive_sum_i = positive_sum - operator.max(v_i, 0.);
            let message = operator.max(b_i, max_b_i) - operator.max(-positive_sum_i, max_b_i);
            core.send(message, neighbor, adapter)?;
        }

        debug!("Saturation factor {:?} ran", core.identity());
        Ok(2 * core.len())
    }
}

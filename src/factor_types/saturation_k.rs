use std::cmp::Ordering;

use log::debug;

use crate::data_structures::best_k_values_tracker::BestKValuesTracker;
use crate::factor_types::factor_core::FactorCore;
use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::factor_types::independent::IndependentFactor;
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::FactorResult;
use crate::maxsum::operator::Operator;

// Value is the sum of the k best potentials among the active neighbors. With fewer than k
// active neighbors every active potential counts; k = 0 makes the factor constant 0.
#[derive(Debug, Clone)]
pub struct SaturationKFactor<T> {
    potentials: IndependentFactor<T>,
    k: usize,
}

impl<T: Identity> SaturationKFactor<T> {
    pub fn new(identity: T, operator: Operator, k: usize) -> Self {
        SaturationKFactor {
            potentials: IndependentFactor::new(identity, operator),
            k,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn potential(&self, neighbor: &T) -> FactorResult<f64> {
        self.potentials.potential(neighbor)
    }

    pub fn set_potential(&mut self, neighbor: &T, potential: f64) -> FactorResult<()> {
        self.potentials.set_potential(neighbor, potential)
    }
}

impl<T: Identity> Factor<T> for SaturationKFactor<T> {
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
        let mut chosen = BestKValuesTracker::new(core.operator(), self.k);
        for neighbor in core.neighbors() {
            if core.is_active(assignment, neighbor)? {
                chosen.track(neighbor.clone(), self.potential(neighbor)?);
            }
        }
        Ok(chosen.sum())
    }

    fn run(&mut self, adapter: &mut dyn CommunicationAdapter<T>) -> FactorResult<usize> {
        let core = self.potentials.core();
        let operator = core.operator();
        let k = self.k;

        if k == 0 {
            for neighbor in core.neighbors() {
                core.send(0., neighbor, adapter)?;
            }
            return Ok(core.len());
        }

        let negative_part = |v: f64| match operator.compare(v, 0.) {
            Ordering::Less => v,
            _ => 0.,
        };

        // max_b: k best of b_i plus the cost of activating i against its message.
        // max_bv_0 / max_bv_1: k-1 / k-2 best of b_i + v_i, only among profitable ones.
        let mut max_b = BestKValuesTracker::new(operator, k);
        let mut max_bv_0 = BestKValuesTracker::new(operator, k - 1);
        let mut max_bv_1 = BestKValuesTracker::new(operator, k.saturating_sub(2));
        let mut positive_sum = 0.;
        for neighbor in core.neighbors() {
            let b_i = self.potential(neighbor)?;
            let v_i = core.message(neighbor)?;

            max_b.track(neighbor.clone(), b_i + negative_part(v_i));
            let bv_i = b_i + v_i;
            if operator.compare(bv_i, 0.) != Ordering::Less {
                max_bv_0.track(neighbor.clone(), bv_i);
                max_bv_1.track(neighbor.clone(), bv_i);
            }
            positive_sum += operator.max(v_i, 0.);
        }

        for neighbor in core.neighbors() {
            let b_i = self.potential(neighbor)?;
            let v_i = core.message(neighbor)?;
            let positive_sum_i = positive_sum - operator.max(v_i, 0.);
            let b_i_negative = b_i + negative_part(v_i);

            // Best value with neighbor i inactive
            let m_0 = operator.max(
                max_bv_0.sum_complementaries(neighbor, b_i + v_i, None),
                max_b.sum_complementaries(neighbor, b_i_negative, None) + positive_sum_i,
            );
            // Best value with neighbor i active, not counting its own message
            let m_1 = operator.max(
                max_bv_1.sum_complementaries(neighbor, b_i + v_i, None) + b_i,
                max_b.sum_complementaries(neighbor, b_i_negative, Some(b_i)) + positive_sum_i,
            );
            core.send(m_1 - m_0, neighbor, adapter)?;
        }

        debug!("Saturation-{} factor {:?} ran", k, core.identity());
        Ok(3 * core.len())
    }
}

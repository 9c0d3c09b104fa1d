use bitvec::prelude::{BitSlice, BitVec, LocalBits};
use log::debug;
use ndarray::{ArrayD, IxDyn};

use crate::factor_types::factor_core::FactorCore;
use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::{FactorError, FactorResult};
use crate::maxsum::operator::Operator;

pub type ActiveFlags = BitSlice<usize, LocalBits>;

// Factor given by an explicit table over every configuration of its neighbors. Axis j of the
// table is the j-th neighbor (index 0 = inactive, 1 = active). Messages are computed by
// enumerating all 2^n configurations, so this is only meant as a reference for small factors.
#[derive(Debug, Clone)]
pub struct StandardFactor<T> {
    core: FactorCore<T>,
    potential: ArrayD<f64>,
}

fn table_shape(n_neighbors: usize) -> Vec<usize> {
    vec![2; n_neighbors]
}

impl<T: Identity> StandardFactor<T> {
    pub fn new(identity: T, operator: Operator) -> Self {
        StandardFactor {
            core: FactorCore::new(identity, operator),
            potential: ArrayD::zeros(IxDyn(&[])),
        }
    }

    pub fn potential(&self) -> &ArrayD<f64> {
        &self.potential
    }

    pub fn set_potential(&mut self, potential: ArrayD<f64>) -> FactorResult<()> {
        let expected = table_shape(self.core.len());
        if potential.shape() != expected.as_slice() {
            return Err(FactorError::ShapeMismatch {
                factor: format!("{:?}", self.core.identity()),
                expected,
                found: potential.shape().to_vec(),
            });
        }
        self.potential = potential;
        Ok(())
    }

    // Fills the table by evaluating `function` on the active flags of every configuration
    pub fn set_potential_fn<F: Fn(&ActiveFlags) -> f64>(&mut self, function: F) {
        let n_neighbors = self.core.len();
        self.potential = ArrayD::from_shape_fn(IxDyn(&table_shape(n_neighbors)), |index| {
            let active: BitVec<usize, LocalBits> =
                (0..n_neighbors).map(|axis| index[axis] == 1).collect();
            function(&active)
        });
    }

    // Neighbor changes invalidate the table
    fn reset_potential(&mut self) {
        self.potential = ArrayD::zeros(IxDyn(&table_shape(self.core.len())));
    }
}

impl<T: Identity> Factor<T> for StandardFactor<T> {
    fn core(&self) -> &FactorCore<T> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FactorCore<T> {
        &mut self.core
    }

    fn add_neighbor(&mut self, neighbor: T) -> bool {
        let added = self.core.add_neighbor(neighbor);
        self.reset_potential();
        added
    }

    fn remove_neighbor(&mut self, neighbor: &T) -> bool {
        let removed = self.core.remove_neighbor(neighbor).is_some();
        self.reset_potential();
        removed
    }

    fn clear_neighbors(&mut self) {
        self.core.clear_neighbors();
        self.reset_potential();
    }

    fn evaluate(&self, assignment: &Assignment<T>) -> FactorResult<f64> {
        let index: Vec<usize> = self
            .core
            .active_flags(assignment)?
            .into_iter()
            .map(usize::from)
            .collect();
        Ok(self.potential[IxDyn(&index)])
    }

    fn run(&mut self, adapter: &mut dyn CommunicationAdapter<T>) -> FactorResult<usize> {
        let operator = self.core.operator();
        let n_neighbors = self.core.len();
        let messages = self.core.incoming()?;

        // best[i][s] = best value of a configuration where neighbor i is in state s, without
        // counting the message coming from i
        let mut best = vec![[operator.worst_value(); 2]; n_neighbors];
        let mut constraint_checks = 0;
        for (index, value) in self.potential.indexed_iter() {
            let total = value
                + (0..n_neighbors)
                    .filter(|&j| index[j] == 1)
                    .map(|j| messages[j])
                    .sum::<f64>();

            for (i, best_i) in best.iter_mut().enumerate() {
                let state = index[i];
                let own = if state == 1 { messages[i] } else { 0. };
                best_i[state] = operator.max(best_i[state], total - own);
            }
            constraint_checks += n_neighbors;
        }

        for (neighbor, best_i) in self.core.neighbors().iter().zip(&best) {
            self.core.send(best_i[1] - best_i[0], neighbor, adapter)?;
        }
        debug!(
            "Standard factor {:?} enumerated {} configurations",
            self.core.identity(),
            self.potential.len()
        );
        Ok(constraint_checks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn construct_factor(operator: Operator, n_neighbors: usize) -> StandardFactor<usize> {
        let mut factor = StandardFactor::new(TESTED, operator);
        link(&mut factor, n_neighbors);
        factor
    }

    #[test]
    fn explicit_table_messages() {
        // f(x0, x1) = 5 if both active, 1 if only x1, 0 otherwise
        let mut factor = construct_factor(Operator::Maximize, 2);
        let table = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![0., 1., 0., 5.]).unwrap();
        factor.set_potential(table).unwrap();

        let sent = run_with_messages(&mut factor, &[-1., -2.]);
        // x0: active -> max(0, 5 - 2) = 3, inactive -> max(0, 1 - 2) = 0
        // x1: active -> max(1, 5 - 1) = 4, inactive -> max(0, -1) = 0
        assert_eq!(sent, vec![3., 4.]);
    }

    #[test]
    fn minimize_prefers_lower_values() {
        let mut factor = construct_factor(Operator::Minimize, 1);
        factor.set_potential_fn(|active| if active[0] { 2. } else { 7. });
        assert_eq!(run_with_messages(&mut factor, &[0.]), vec![-5.]);
    }

    #[test]
    fn potential_function_sees_flags_in_neighbor_order() {
        let mut factor = construct_factor(Operator::Maximize, 3);
        factor.set_potential_fn(|active| {
            active.iter_ones().map(|i| 10f64.powi(i as i32)).sum()
        });
        let assignment = Assignment::from([(0, true), (1, false), (2, true)]);
        assert_eq!(factor.evaluate(&assignment).unwrap(), 101.);
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let mut factor = construct_factor(Operator::Maximize, 2);
        let table = ArrayD::zeros(IxDyn(&[2, 2, 2]));
        assert!(matches!(
            factor.set_potential(table),
            Err(FactorError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn neighbor_changes_reset_table() {
        let mut factor = construct_factor(Operator::Maximize, 1);
        factor.set_potential_fn(|_| 3.);
        factor.add_neighbor(1);
        assert_eq!(factor.potential().shape(), &[2, 2]);
        assert!(factor.potential().iter().all(|value| *value == 0.));
    }
}

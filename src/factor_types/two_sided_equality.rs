use log::debug;

use crate::factor_types::factor_core::FactorCore;
use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::factor_types::two_sided::{TwoSidedCore, TwoSidedFactor};
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::FactorResult;
use crate::maxsum::operator::Operator;

// As many neighbors of set A as of set B must be active
#[derive(Debug, Clone)]
pub struct TwoSidedEqualityFactor<T> {
    sides: TwoSidedCore<T>,
}

impl<T: Identity> TwoSidedEqualityFactor<T> {
    pub fn new(identity: T, operator: Operator) -> Self {
        TwoSidedEqualityFactor {
            sides: TwoSidedCore::new(identity, operator),
        }
    }
}

impl<T: Identity> TwoSidedFactor<T> for TwoSidedEqualityFactor<T> {
    fn sides(&self) -> &TwoSidedCore<T> {
        &self.sides
    }

    fn sides_mut(&mut self) -> &mut TwoSidedCore<T> {
        &mut self.sides
    }
}

impl<T: Identity> Factor<T> for TwoSidedEqualityFactor<T> {
    fn core(&self) -> &FactorCore<T> {
        self.sides.core()
    }

    fn core_mut(&mut self) -> &mut FactorCore<T> {
        self.sides.core_mut()
    }

    fn add_neighbor(&mut self, neighbor: T) -> bool {
        self.sides.add_neighbor_b(neighbor)
    }

    fn remove_neighbor(&mut self, neighbor: &T) -> bool {
        self.sides.remove_neighbor(neighbor)
    }

    fn clear_neighbors(&mut self) {
        self.sides.clear_neighbors()
    }

    fn evaluate(&self, assignment: &Assignment<T>) -> FactorResult<f64> {
        match self.sides.reserve(assignment)? {
            0 => Ok(0.),
            _ => Ok(self.core().operator().worst_value()),
        }
    }

    fn run(&mut self, adapter: &mut dyn CommunicationAdapter<T>) -> FactorResult<usize> {
        let core = self.sides.core();
        let operator = core.operator();
        let worst = operator.worst_value();
        let n_elements_a = self.sides.n_elements_a();
        let n_elements_b = self.sides.n_elements_b();

        // An empty side forces every neighbor of the other one to stay inactive
        if n_elements_a == 0 || n_elements_b == 0 {
            for neighbor in core.neighbors() {
                core.send(worst, neighbor, adapter)?;
            }
            return Ok(core.len());
        }

        let (pairs_a, pairs_b, mut constraint_checks) = self.sides.sorted_pairs()?;

        // eta = number of (A, B) pairs worth activating together
        let mut eta = 0;
        while eta < n_elements_a.min(n_elements_b)
            && operator.compare(pairs_b[eta].1 + pairs_a[eta].1, 0.).is_ge()
        {
            eta += 1;
        }
        constraint_checks += 3 * eta;

        let nu_a_eta = if eta == 0 { -worst } else { pairs_a[eta - 1].1 };
        let nu_a_next = if n_elements_a > eta { pairs_a[eta].1 } else { worst };
        let nu_b_eta = if eta == 0 { -worst } else { pairs_b[eta - 1].1 };
        let nu_b_next = if n_elements_b > eta { pairs_b[eta].1 } else { worst };

        let tau_plus = -operator.max(-nu_b_eta, nu_a_next);
        let tau_minus = operator.max(-nu_a_eta, nu_b_next);
        constraint_checks += 6;

        for (index, (neighbor, _)) in pairs_a.iter().enumerate() {
            let message = if index < eta { tau_plus } else { tau_minus };
            core.send(message, neighbor, adapter)?;
        }
        for (index, (neighbor, _)) in pairs_b.iter().enumerate() {
            let message = if index < eta { -tau_minus } else { -tau_plus };
            core.send(message, neighbor, adapter)?;
        }
        constraint_checks += core.len();

        debug!(
            "Two-sided equality {:?} activates {} pairs",
            core.identity(),
            eta
        );
        Ok(constraint_checks)
    }
}

use log::debug;

use crate::factor_types::factor_core::FactorCore;
use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::factor_types::two_sided::{Pair, TwoSidedCore, TwoSidedFactor};
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::FactorResult;
use crate::maxsum::operator::Operator;

// At least as many neighbors of set A as of set B must be active
#[derive(Debug, Clone)]
pub struct TwoSidedReserveFactor<T> {
    sides: TwoSidedCore<T>,
}

impl<T: Identity> TwoSidedReserveFactor<T> {
    pub fn new(identity: T, operator: Operator) -> Self {
        TwoSidedReserveFactor {
            sides: TwoSidedCore::new(identity, operator),
        }
    }

    // Number of leading (best) A messages that are at least as good as 0
    fn count_positive(&self, pairs: &[Pair<T>]) -> usize {
        let operator = self.sides.core().operator();
        pairs
            .iter()
            .take_while(|(_, message)| operator.compare(*message, 0.).is_ge())
            .count()
    }
}

impl<T: Identity> TwoSidedFactor<T> for TwoSidedReserveFactor<T> {
    fn sides(&self) -> &TwoSidedCore<T> {
        &self.sides
    }

    fn sides_mut(&mut self) -> &mut TwoSidedCore<T> {
        &mut self.sides
    }
}

impl<T: Identity> Factor<T> for TwoSidedReserveFactor<T> {
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
        if self.sides.reserve(assignment)? >= 0 {
            Ok(0.)
        } else {
            Ok(self.core().operator().worst_value())
        }
    }

    fn run(&mut self, adapter: &mut dyn CommunicationAdapter<T>) -> FactorResult<usize> {
        let core = self.sides.core();
        let operator = core.operator();
        let worst = operator.worst_value();
        let n_elements_a = self.sides.n_elements_a();
        let n_elements_b = self.sides.n_elements_b();

        // Without A nothing in B may be active; without B there is nothing to constrain
        if n_elements_a == 0 || n_elements_b == 0 {
            let message = if n_elements_a == 0 { worst } else { 0. };
            for neighbor in core.neighbors() {
                core.send(message, neighbor, adapter)?;
            }
            return Ok(core.len());
        }

        let (pairs_a, pairs_b, mut constraint_checks) = self.sides.sorted_pairs()?;

        // theta = number of B neighbors worth activating, each backed by an A neighbor
        let mut theta = 0;
        while theta < n_elements_a.min(n_elements_b)
            && operator.is_better(pairs_b[theta].1, 0.)
            && operator
                .compare(pairs_b[theta].1 + pairs_a[theta].1, 0.)
                .is_ge()
        {
            theta += 1;
        }
        constraint_checks += 3 * theta;

        let nu_a_theta = if theta == 0 { -worst } else { pairs_a[theta - 1].1 };
        let nu_a_next = if n_elements_a > theta { pairs_a[theta].1 } else { worst };
        let nu_b_theta = if theta == 0 { -worst } else { pairs_b[theta - 1].1 };
        let nu_b_next = if n_elements_b > theta { pairs_b[theta].1 } else { worst };

        let value_a = operator.max(nu_a_next, -nu_b_theta);
        let value_b = operator.max(0., operator.max(nu_b_next, -nu_a_theta));
        constraint_checks += 6;

        let n_positive_a = self.count_positive(&pairs_a);
        constraint_checks += n_positive_a;

        if n_positive_a > theta {
            // A has slack: nobody's choice is constrained
            for neighbor in core.neighbors() {
                core.send(0., neighbor, adapter)?;
            }
        } else {
            let n_active_a = theta.max(n_positive_a);
            for (index, (neighbor, _)) in pairs_a.iter().enumerate() {
                let message = if index < n_active_a { -value_a } else { value_b };
                core.send(message, neighbor, adapter)?;
            }
            for (index, (neighbor, _)) in pairs_b.iter().enumerate() {
                let message = if index < theta { -value_b } else { value_a };
                core.send(message, neighbor, adapter)?;
            }
        }
        constraint_checks += core.len();

        debug!(
            "Two-sided reserve {:?} activates {} B neighbors",
            core.identity(),
            theta
        );
        Ok(constraint_checks)
    }
}

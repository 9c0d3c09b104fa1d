use std::collections::HashMap;

use log::debug;

use crate::factor_types::factor_core::FactorCore;
use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::factor_types::proxy::MessageOffset;
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::{FactorError, FactorResult};
use crate::maxsum::operator::Operator;

// Sum of a fixed potential per active neighbor. Potentials start at 0 when a neighbor is
// linked and are dropped with it. Changing a potential only affects the next run.
#[derive(Debug, Clone)]
pub struct IndependentFactor<T> {
    core: FactorCore<T>,
    potentials: HashMap<T, f64>,
}

impl<T: Identity> IndependentFactor<T> {
    pub fn new(identity: T, operator: Operator) -> Self {
        IndependentFactor {
            core: FactorCore::new(identity, operator),
            potentials: HashMap::new(),
        }
    }

    pub fn potential(&self, neighbor: &T) -> FactorResult<f64> {
        self.potentials
            .get(neighbor)
            .copied()
            .ok_or_else(|| FactorError::invalid_neighbor(self.core.identity(), neighbor))
    }

    pub fn set_potential(&mut self, neighbor: &T, potential: f64) -> FactorResult<()> {
        match self.potentials.get_mut(neighbor) {
            Some(stored) => {
                *stored = potential;
                Ok(())
            }
            None => Err(FactorError::invalid_neighbor(self.core.identity(), neighbor)),
        }
    }

    // Puts the potential of `neighbor` back to 0 and returns the previous one
    pub fn remove_potential(&mut self, neighbor: &T) -> FactorResult<f64> {
        let previous = self.potential(neighbor)?;
        self.set_potential(neighbor, 0.)?;
        Ok(previous)
    }

    pub fn clear_potentials(&mut self) {
        self.potentials.values_mut().for_each(|potential| *potential = 0.);
    }
}

impl<T: Identity> MessageOffset<T> for IndependentFactor<T> {
    fn offset(&self, neighbor: &T) -> f64 {
        self.potentials.get(neighbor).copied().unwrap_or(0.)
    }
}

impl<T: Identity> Factor<T> for IndependentFactor<T> {
    fn core(&self) -> &FactorCore<T> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FactorCore<T> {
        &mut self.core
    }

    fn add_neighbor(&mut self, neighbor: T) -> bool {
        if !self.core.add_neighbor(neighbor.clone()) {
            return false;
        }
        self.potentials.insert(neighbor, 0.);
        true
    }

    fn remove_neighbor(&mut self, neighbor: &T) -> bool {
        self.potentials.remove(neighbor);
        self.core.remove_neighbor(neighbor).is_some()
    }

    fn clear_neighbors(&mut self) {
        self.potentials.clear();
        self.core.clear_neighbors();
    }

    fn evaluate(&self, assignment: &Assignment<T>) -> FactorResult<f64> {
        let mut value = 0.;
        for neighbor in self.core.neighbors() {
            if self.core.is_active(assignment, neighbor)? {
                value += self.potential(neighbor)?;
            }
        }
        Ok(value)
    }

    fn run(&mut self, adapter: &mut dyn CommunicationAdapter<T>) -> FactorResult<usize> {
        for neighbor in self.core.neighbors() {
            self.core.send(self.potential(neighbor)?, neighbor, adapter)?;
        }
        debug!(
            "Independent factor {:?} sent {} potentials",
            self.core.identity(),
            self.core.len()
        );
        Ok(self.core.len())
    }
}

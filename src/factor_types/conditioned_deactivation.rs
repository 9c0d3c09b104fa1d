use log::debug;

use crate::factor_types::factor_core::FactorCore;
use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::FactorResult;
use crate::maxsum::operator::Operator;

// No neighbor may be active unless the exemplar neighbor is. The exemplar must also be linked.
#[derive(Debug, Clone)]
pub struct ConditionedDeactivationFactor<T> {
    core: FactorCore<T>,
    exemplar: T,
}

impl<T: Identity> ConditionedDeactivationFactor<T> {
    pub fn new(identity: T, operator: Operator, exemplar: T) -> Self {
        ConditionedDeactivationFactor {
            core: FactorCore::new(identity, operator),
            exemplar,
        }
    }

    pub fn exemplar(&self) -> &T {
        &self.exemplar
    }

    pub fn set_exemplar(&mut self, exemplar: T) {
        self.exemplar = exemplar;
    }
}

impl<T: Identity> Factor<T> for ConditionedDeactivationFactor<T> {
    fn core(&self) -> &FactorCore<T> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FactorCore<T> {
        &mut self.core
    }

    fn evaluate(&self, assignment: &Assignment<T>) -> FactorResult<f64> {
        if self.core.is_active(assignment, &self.exemplar)? {
            return Ok(0.);
        }
        match self.core.count_active(assignment)? {
            0 => Ok(0.),
            _ => Ok(self.core.operator().worst_value()),
        }
    }

    fn run(&mut self, adapter: &mut dyn CommunicationAdapter<T>) -> FactorResult<usize> {
        let operator = self.core.operator();
        let exemplar_message = self.core.message(&self.exemplar)?;

        let mut positive_sum = 0.;
        for neighbor in self.core.neighbors() {
            if *neighbor != self.exemplar {
                positive_sum += operator.max(0., self.core.message(neighbor)?);
            }
        }

        for neighbor in self.core.neighbors() {
            if *neighbor == self.exemplar {
                self.core.send(positive_sum, neighbor, adapter)?;
                continue;
            }
            let message = self.core.message(neighbor)?;
            let active = exemplar_message + positive_sum - operator.max(message, 0.);
            self.core
                .send(active - operator.max(0., active), neighbor, adapter)?;
        }

        debug!(
            "Conditioned deactivation {:?} ran on exemplar {:?}",
            self.core.identity(),
            self.exemplar
        );
        Ok(2 * self.core.len())
    }
}

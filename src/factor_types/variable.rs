use log::debug;

use crate::factor_types::factor_core::FactorCore;
use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::FactorResult;
use crate::maxsum::operator::Operator;

// Binary variable shared by several factors: every link must take the same value
#[derive(Debug, Clone)]
pub struct VariableFactor<T> {
    core: FactorCore<T>,
    belief: f64,
}

impl<T: Identity> VariableFactor<T> {
    pub fn new(identity: T, operator: Operator) -> Self {
        VariableFactor {
            core: FactorCore::new(identity, operator),
            belief: 0.,
        }
    }

    // Sum of the messages used in the last run
    pub fn belief(&self) -> f64 {
        self.belief
    }
}

impl<T: Identity> Factor<T> for VariableFactor<T> {
    fn core(&self) -> &FactorCore<T> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FactorCore<T> {
        &mut self.core
    }

    fn evaluate(&self, assignment: &Assignment<T>) -> FactorResult<f64> {
        let flags = self.core.active_flags(assignment)?;
        match flags.first() {
            Some(first) if flags.iter().any(|flag| flag != first) => {
                Ok(self.core.operator().worst_value())
            }
            _ => Ok(0.),
        }
    }

    fn run(&mut self, adapter: &mut dyn CommunicationAdapter<T>) -> FactorResult<usize> {
        let messages = self.core.incoming()?;
        self.belief = messages.iter().sum();

        for (neighbor, message) in self.core.neighbors().iter().zip(&messages) {
            self.core.send(self.belief - message, neighbor, adapter)?;
        }
        debug!(
            "Variable {:?} has belief {}",
            self.core.identity(),
            self.belief
        );
        Ok(2 * messages.len())
    }
}

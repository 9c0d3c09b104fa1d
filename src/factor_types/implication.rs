use log::debug;

use crate::factor_types::factor_core::FactorCore;
use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::FactorResult;
use crate::maxsum::operator::Operator;

// Activating a neighbor forces every later neighbor (in neighbor order) to be active, so the
// feasible configurations are the suffixes: inactive up to some threshold, active after it.
#[derive(Debug, Clone)]
pub struct ImplicationFactor<T> {
    core: FactorCore<T>,
}

impl<T: Identity> ImplicationFactor<T> {
    pub fn new(identity: T, operator: Operator) -> Self {
        ImplicationFactor {
            core: FactorCore::new(identity, operator),
        }
    }
}

impl<T: Identity> Factor<T> for ImplicationFactor<T> {
    fn core(&self) -> &FactorCore<T> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FactorCore<T> {
        &mut self.core
    }

    fn evaluate(&self, assignment: &Assignment<T>) -> FactorResult<f64> {
        let flags = self.core.active_flags(assignment)?;
        let broken = flags.windows(2).any(|pair| pair[0] && !pair[1]);
        Ok(if broken {
            self.core.operator().worst_value()
        } else {
            0.
        })
    }

    fn run(&mut self, adapter: &mut dyn CommunicationAdapter<T>) -> FactorResult<usize> {
        let operator = self.core.operator();
        let messages = self.core.incoming()?;
        let n = messages.len();
        if n == 0 {
            return Ok(0);
        }

        // accumulated[t] = value of the configuration where neighbors t.. are active
        let mut accumulated = vec![0.; n + 1];
        for t in (0..n).rev() {
            accumulated[t] = accumulated[t + 1] + messages[t];
        }

        // phi_zero[i] = best threshold after i (neighbor i inactive)
        let mut phi_zero = vec![n; n];
        let mut best_after = accumulated[n];
        for i in (0..n).rev() {
            if i > 0 {
                phi_zero[i - 1] = if operator.compare(accumulated[i], best_after).is_ge() {
                    i
                } else {
                    phi_zero[i]
                };
            }
            best_after = operator.max(best_after, accumulated[i]);
        }

        // phi_one = best threshold up to i (neighbor i active)
        let mut phi_one = 0;
        for (i, neighbor) in self.core.neighbors().iter().enumerate() {
            if operator.is_better(accumulated[i], accumulated[phi_one]) {
                phi_one = i;
            }
            let message = accumulated[phi_one] - accumulated[phi_zero[i]] - messages[i];
            self.core.send(message, neighbor, adapter)?;
        }

        debug!("Implication factor {:?} ran", self.core.identity());
        Ok(3 * n)
    }
}

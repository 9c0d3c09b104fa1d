use log::debug;

use crate::data_structures::best_values_tracker::BestValuesTracker;
use crate::factor_types::factor_core::FactorCore;
use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::FactorResult;
use crate::maxsum::operator::Operator;

// Exactly one neighbor must be active
#[derive(Debug, Clone)]
pub struct SelectorFactor<T> {
    core: FactorCore<T>,
    selected: Option<T>,
}

impl<T: Identity> SelectorFactor<T> {
    pub fn new(identity: T, operator: Operator) -> Self {
        SelectorFactor {
            core: FactorCore::new(identity, operator),
            selected: None,
        }
    }

    // Neighbor with the best message in the last run
    pub fn select(&self) -> Option<&T> {
        self.selected.as_ref()
    }
}

impl<T: Identity> Factor<T> for SelectorFactor<T> {
    fn core(&self) -> &FactorCore<T> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FactorCore<T> {
        &mut self.core
    }

    fn remove_neighbor(&mut self, neighbor: &T) -> bool {
        if self.selected.as_ref() == Some(neighbor) {
            self.selected = None;
        }
        self.core.remove_neighbor(neighbor).is_some()
    }

    fn evaluate(&self, assignment: &Assignment<T>) -> FactorResult<f64> {
        match self.core.count_active(assignment)? {
            1 => Ok(0.),
            _ => Ok(self.core.operator().worst_value()),
        }
    }

    fn run(&mut self, adapter: &mut dyn CommunicationAdapter<T>) -> FactorResult<usize> {
        let mut tracker = BestValuesTracker::new(self.core.operator());
        for neighbor in self.core.neighbors() {
            tracker.track(neighbor.clone(), self.core.message(neighbor)?);
        }

        for neighbor in self.core.neighbors() {
            self.core
                .send(-tracker.complementary(neighbor), neighbor, adapter)?;
        }

        self.selected = tracker.best().cloned();
        debug!(
            "Selector {:?} prefers {:?}",
            self.core.identity(),
            self.selected
        );
        Ok(2 * self.core.len())
    }
}

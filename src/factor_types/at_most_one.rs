use std::cmp::Ordering;

use log::debug;

use crate::data_structures::best_values_tracker::BestValuesTracker;
use crate::factor_types::factor_core::FactorCore;
use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::FactorResult;
use crate::maxsum::operator::Operator;

// At most one neighbor may be active
#[derive(Debug, Clone)]
pub struct AtMostOneFactor<T> {
    core: FactorCore<T>,
    selected: Option<T>,
}

impl<T: Identity> AtMostOneFactor<T> {
    pub fn new(identity: T, operator: Operator) -> Self {
        AtMostOneFactor {
            core: FactorCore::new(identity, operator),
            selected: None,
        }
    }

    // Neighbor chosen in the last run, None when choosing nothing was better
    pub fn select(&self) -> Option<&T> {
        self.selected.as_ref()
    }
}

impl<T: Identity> Factor<T> for AtMostOneFactor<T> {
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
            0 | 1 => Ok(0.),
            _ => Ok(self.core.operator().worst_value()),
        }
    }

    fn run(&mut self, adapter: &mut dyn CommunicationAdapter<T>) -> FactorResult<usize> {
        let operator = self.core.operator();
        let mut tracker = BestValuesTracker::new(operator);
        for neighbor in self.core.neighbors() {
            tracker.track(neighbor.clone(), self.core.message(neighbor)?);
        }

        for neighbor in self.core.neighbors() {
            let message = -operator.max(0., tracker.complementary(neighbor));
            self.core.send(message, neighbor, adapter)?;
        }

        self.selected = match operator.compare(tracker.best_value(), 0.) {
            Ordering::Less => None,
            _ => tracker.best().cloned(),
        };
        debug!(
            "At-most-one {:?} prefers {:?}",
            self.core.identity(),
            self.selected
        );
        Ok(2 * self.core.len())
    }
}

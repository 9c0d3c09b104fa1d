use std::collections::HashMap;

use log::trace;

use crate::factor_types::factor_trait::{Assignment, Identity};
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::{FactorError, FactorResult};
use crate::maxsum::operator::Operator;

// State embedded in every factor. Every key of `messages` is a current neighbor, and stored
// messages persist across runs until overwritten by `receive`.
#[derive(Debug, Clone)]
pub struct FactorCore<T> {
    identity: T,
    operator: Operator,
    neighbors: Vec<T>,          // insertion order, some factors partition it
    messages: HashMap<T, f64>,  // last message received from each neighbor
}

impl<T: Identity> FactorCore<T> {
    pub fn new(identity: T, operator: Operator) -> Self {
        FactorCore {
            identity,
            operator,
            neighbors: Vec::new(),
            messages: HashMap::new(),
        }
    }

    pub fn identity(&self) -> &T {
        &self.identity
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn neighbors(&self) -> &[T] {
        &self.neighbors
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn is_neighbor(&self, neighbor: &T) -> bool {
        self.messages.contains_key(neighbor)
    }

    pub fn position(&self, neighbor: &T) -> Option<usize> {
        self.neighbors.iter().position(|n| n == neighbor)
    }

    pub fn add_neighbor(&mut self, neighbor: T) -> bool {
        let index = self.neighbors.len();
        self.insert_neighbor(index, neighbor)
    }

    // Links `neighbor` at position `index` of the neighbor list
    pub fn insert_neighbor(&mut self, index: usize, neighbor: T) -> bool {
        if self.is_neighbor(&neighbor) {
            return false;
        }
        self.messages.insert(neighbor.clone(), 0.);
        self.neighbors.insert(index.min(self.neighbors.len()), neighbor);
        true
    }

    // Returns the position the neighbor had
    pub fn remove_neighbor(&mut self, neighbor: &T) -> Option<usize> {
        self.messages.remove(neighbor)?;
        let index = self.position(neighbor)?;
        self.neighbors.remove(index);
        Some(index)
    }

    pub fn clear_neighbors(&mut self) {
        self.neighbors.clear();
        self.messages.clear();
    }

    pub fn receive(&mut self, message: f64, sender: &T) -> FactorResult<()> {
        match self.messages.get_mut(sender) {
            Some(stored) => {
                *stored = message;
                Ok(())
            }
            None => Err(FactorError::invalid_neighbor(&self.identity, sender)),
        }
    }

    pub fn message(&self, neighbor: &T) -> FactorResult<f64> {
        self.messages
            .get(neighbor)
            .copied()
            .ok_or_else(|| FactorError::invalid_neighbor(&self.identity, neighbor))
    }

    // Stored messages in neighbor order
    pub fn incoming(&self) -> FactorResult<Vec<f64>> {
        self.neighbors
            .iter()
            .map(|neighbor| self.message(neighbor))
            .collect()
    }

    pub fn send(
        &self,
        message: f64,
        recipient: &T,
        adapter: &mut dyn CommunicationAdapter<T>,
    ) -> FactorResult<()> {
        trace!("{:?} sends {} to {:?}", self.identity, message, recipient);
        adapter.send(message, &self.identity, recipient)
    }

    pub fn is_active(&self, assignment: &Assignment<T>, neighbor: &T) -> FactorResult<bool> {
        assignment
            .get(neighbor)
            .copied()
            .ok_or_else(|| FactorError::unassigned_neighbor(&self.identity, neighbor))
    }

    // Value of every neighbor in `assignment`, in neighbor order
    pub fn active_flags(&self, assignment: &Assignment<T>) -> FactorResult<Vec<bool>> {
        self.neighbors
            .iter()
            .map(|neighbor| self.is_active(assignment, neighbor))
            .collect()
    }

    pub fn count_active(&self, assignment: &Assignment<T>) -> FactorResult<usize> {
        Ok(self
            .active_flags(assignment)?
            .into_iter()
            .filter(|active| *active)
            .count())
    }
}

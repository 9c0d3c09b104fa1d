use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::factor_types::factor_core::FactorCore;
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::FactorResult;
use crate::maxsum::operator::Operator;

// Opaque label of a factor, used both as a lookup key and to order ties
pub trait Identity: Clone + Eq + Hash + Ord + Debug + Send + Sync {}

impl<T: Clone + Eq + Hash + Ord + Debug + Send + Sync> Identity for T {}

// Value of every neighbor (binary variable) of a factor
pub type Assignment<T> = HashMap<T, bool>;

// A node of a binary max-sum factor graph. Messages are value(active) - value(inactive) for
// the link to each neighbor.
pub trait Factor<T: Identity> {
    // Bookkeeping shared by every factor (identity, operator, neighbors, received messages)
    fn core(&self) -> &FactorCore<T>;
    fn core_mut(&mut self) -> &mut FactorCore<T>;

    fn identity(&self) -> &T {
        self.core().identity()
    }

    fn operator(&self) -> Operator {
        self.core().operator()
    }

    fn neighbors(&self) -> &[T] {
        self.core().neighbors()
    }

    // Returns false if `neighbor` was already linked
    fn add_neighbor(&mut self, neighbor: T) -> bool {
        self.core_mut().add_neighbor(neighbor)
    }

    // Returns false if `neighbor` was not linked
    fn remove_neighbor(&mut self, neighbor: &T) -> bool {
        self.core_mut().remove_neighbor(neighbor).is_some()
    }

    fn clear_neighbors(&mut self) {
        self.core_mut().clear_neighbors()
    }

    // Stores the last message received from `sender`
    fn receive(&mut self, message: f64, sender: &T) -> FactorResult<()> {
        self.core_mut().receive(message, sender)
    }

    // Last message received from `neighbor`, 0 until something arrives
    fn message(&self, neighbor: &T) -> FactorResult<f64> {
        self.core().message(neighbor)
    }

    fn send(
        &self,
        message: f64,
        recipient: &T,
        adapter: &mut dyn CommunicationAdapter<T>,
    ) -> FactorResult<()> {
        self.core().send(message, recipient, adapter)
    }

    // Local utility/cost of a complete assignment of the neighbors
    fn evaluate(&self, assignment: &Assignment<T>) -> FactorResult<f64>;

    // Computes a message for every neighbor from the stored messages and sends it.
    // Returns the number of constraint checks performed.
    fn run(&mut self, adapter: &mut dyn CommunicationAdapter<T>) -> FactorResult<usize>;
}

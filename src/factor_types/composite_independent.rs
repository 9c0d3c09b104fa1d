use crate::factor_types::factor_core::FactorCore;
use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::factor_types::independent::IndependentFactor;
use crate::factor_types::proxy::OffsetAdapter;
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::{FactorError, FactorResult};

// Inner factor plus an independent potential per neighbor. Messages from the neighbors are
// stored as received, the inner factor holds them shifted by the potentials and everything it
// sends goes back out through the potentials.
#[derive(Debug, Clone)]
pub struct CompositeIndependentFactor<T, F> {
    core: FactorCore<T>,
    inner: F,
    independent: IndependentFactor<T>,
}

impl<T: Identity, F: Factor<T>> CompositeIndependentFactor<T, F> {
    // Takes over the identity, operator and neighbors of `inner`
    pub fn new(mut inner: F) -> Self {
        let identity = inner.identity().clone();
        let operator = inner.operator();
        let neighbors = inner.neighbors().to_vec();
        inner.clear_neighbors();

        let mut composite = CompositeIndependentFactor {
            core: FactorCore::new(identity.clone(), operator),
            inner,
            independent: IndependentFactor::new(identity, operator),
        };
        for neighbor in neighbors {
            composite.add_neighbor(neighbor);
        }
        composite
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    // Partition changes do not touch stored messages
    pub(crate) fn inner_mut(&mut self) -> &mut F {
        &mut self.inner
    }

    // Links `neighbor` to the inner factor through `link`, then to the composite itself
    pub(crate) fn link_inner<L>(&mut self, neighbor: T, link: L) -> FactorResult<bool>
    where
        L: FnOnce(&mut F, T) -> FactorResult<bool>,
    {
        if self.core.is_neighbor(&neighbor) || !link(&mut self.inner, neighbor.clone())? {
            return Ok(false);
        }
        self.core.add_neighbor(neighbor.clone());
        self.independent.add_neighbor(neighbor);
        Ok(true)
    }

    pub fn independent(&self) -> &IndependentFactor<T> {
        &self.independent
    }

    pub fn potential(&self, neighbor: &T) -> FactorResult<f64> {
        self.independent.potential(neighbor)
    }

    pub fn set_potential(&mut self, neighbor: &T, potential: f64) -> FactorResult<()> {
        self.independent.set_potential(neighbor, potential)?;
        let received = self.core.message(neighbor)?;
        self.inner.receive(received + potential, neighbor)
    }
}

impl<T: Identity, F: Factor<T>> Factor<T> for CompositeIndependentFactor<T, F> {
    fn core(&self) -> &FactorCore<T> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FactorCore<T> {
        &mut self.core
    }

    fn add_neighbor(&mut self, neighbor: T) -> bool {
        self.link_inner(neighbor, |inner, neighbor| Ok(inner.add_neighbor(neighbor)))
            .unwrap_or(false)
    }

    fn remove_neighbor(&mut self, neighbor: &T) -> bool {
        if self.core.remove_neighbor(neighbor).is_none() {
            return false;
        }
        self.independent.remove_neighbor(neighbor);
        self.inner.remove_neighbor(neighbor);
        true
    }

    fn clear_neighbors(&mut self) {
        self.core.clear_neighbors();
        self.independent.clear_neighbors();
        self.inner.clear_neighbors();
    }

    fn receive(&mut self, message: f64, sender: &T) -> FactorResult<()> {
        self.core.receive(message, sender)?;
        self.inner
            .receive(message + self.independent.potential(sender)?, sender)
    }

    // Messages only leave through `run`
    fn send(
        &self,
        _message: f64,
        _recipient: &T,
        _adapter: &mut dyn CommunicationAdapter<T>,
    ) -> FactorResult<()> {
        Err(FactorError::unsupported(self.core.identity(), "direct send"))
    }

    fn evaluate(&self, assignment: &Assignment<T>) -> FactorResult<f64> {
        Ok(self.inner.evaluate(assignment)? + self.independent.evaluate(assignment)?)
    }

    fn run(&mut self, adapter: &mut dyn CommunicationAdapter<T>) -> FactorResult<usize> {
        let mut through_potentials = OffsetAdapter::new(adapter, &self.independent);
        let constraint_checks = self.inner.run(&mut through_potentials)?;
        Ok(self.core.len() + constraint_checks)
    }
}

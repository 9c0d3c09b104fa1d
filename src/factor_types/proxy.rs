use std::collections::HashMap;

use crate::factor_types::factor_core::FactorCore;
use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::{FactorError, FactorResult};

// Additive potential a decorator applies at its boundary for each neighbor
pub trait MessageOffset<T> {
    fn offset(&self, neighbor: &T) -> f64;

    // Called when `neighbor` is unlinked
    fn forget(&mut self, _neighbor: &T) {}

    fn forget_all(&mut self) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl<T> MessageOffset<T> for PassThrough {
    fn offset(&self, _neighbor: &T) -> f64 {
        0.
    }
}

// One potential per neighbor, 0 unless set
#[derive(Debug, Clone)]
pub struct NeighborWeights<T> {
    weights: HashMap<T, f64>,
}

impl<T: Identity> NeighborWeights<T> {
    pub fn new() -> Self {
        NeighborWeights {
            weights: HashMap::new(),
        }
    }
}

impl<T: Identity> Default for NeighborWeights<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Identity> MessageOffset<T> for NeighborWeights<T> {
    fn offset(&self, neighbor: &T) -> f64 {
        self.weights.get(neighbor).copied().unwrap_or(0.)
    }

    fn forget(&mut self, neighbor: &T) {
        self.weights.remove(neighbor);
    }

    fn forget_all(&mut self) {
        self.weights.clear();
    }
}

// Same potential for every neighbor
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformWeight {
    weight: f64,
}

impl<T> MessageOffset<T> for UniformWeight {
    fn offset(&self, _neighbor: &T) -> f64 {
        self.weight
    }
}

// Stored message that was received under potential `old` as it reads under potential `new`
pub fn rebias(stored: f64, old: f64, new: f64) -> f64 {
    stored - old + new
}

// Adds the offset of the recipient to everything sent through it
pub(crate) struct OffsetAdapter<'a, T, X> {
    adapter: &'a mut dyn CommunicationAdapter<T>,
    offset: &'a X,
}

impl<'a, T, X> OffsetAdapter<'a, T, X> {
    pub(crate) fn new(adapter: &'a mut dyn CommunicationAdapter<T>, offset: &'a X) -> Self {
        OffsetAdapter { adapter, offset }
    }
}

impl<'a, T: Identity, X: MessageOffset<T>> CommunicationAdapter<T> for OffsetAdapter<'a, T, X> {
    fn send(&mut self, message: f64, sender: &T, recipient: &T) -> FactorResult<()> {
        self.adapter
            .send(message + self.offset.offset(recipient), sender, recipient)
    }
}

/// Decorator around an inner factor.
///
/// Every message crossing the boundary is shifted by the offset of the neighbor it comes from
/// or goes to: the inner factor perceives `message + offset`, and what it sends leaves as
/// `message + offset`. The decorated factor thus behaves as the inner one plus an independent
/// potential per neighbor. With [`PassThrough`] it is transparent.
///
/// The inner factor should not hold messages yet when it is wrapped.
#[derive(Debug, Clone)]
pub struct ProxyFactor<F, X> {
    inner: F,
    offset: X,
}

pub type WeightingFactor<T, F> = ProxyFactor<F, NeighborWeights<T>>;
pub type SingleWeightFactor<F> = ProxyFactor<F, UniformWeight>;

impl<F, X> ProxyFactor<F, X> {
    pub fn new(inner: F, offset: X) -> Self {
        ProxyFactor { inner, offset }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    pub fn into_inner(self) -> F {
        self.inner
    }

    // Partition changes do not touch stored messages
    pub(crate) fn inner_mut(&mut self) -> &mut F {
        &mut self.inner
    }

    // Links `neighbor` to the inner factor through `link`. A new neighbor reads as having
    // sent 0, so the inner factor starts from its offset.
    pub(crate) fn link_inner<T, L>(&mut self, neighbor: T, link: L) -> FactorResult<bool>
    where
        T: Identity,
        F: Factor<T>,
        X: MessageOffset<T>,
        L: FnOnce(&mut F, T) -> FactorResult<bool>,
    {
        if !link(&mut self.inner, neighbor.clone())? {
            return Ok(false);
        }
        self.inner
            .receive(self.offset.offset(&neighbor), &neighbor)?;
        Ok(true)
    }
}

impl<F> ProxyFactor<F, PassThrough> {
    pub fn pass_through(inner: F) -> Self {
        ProxyFactor::new(inner, PassThrough)
    }
}

impl<T: Identity, F: Factor<T>> ProxyFactor<F, NeighborWeights<T>> {
    pub fn weighting(inner: F) -> Self {
        ProxyFactor::new(inner, NeighborWeights::new())
    }

    pub fn potential(&self, neighbor: &T) -> FactorResult<f64> {
        if !self.inner.core().is_neighbor(neighbor) {
            return Err(FactorError::invalid_neighbor(self.inner.identity(), neighbor));
        }
        Ok(self.offset.offset(neighbor))
    }

    // Also rebiases what the inner factor holds from `neighbor`
    pub fn set_potential(&mut self, neighbor: &T, potential: f64) -> FactorResult<()> {
        let old = self.potential(neighbor)?;
        let stored = self.inner.message(neighbor)?;
        self.inner.receive(rebias(stored, old, potential), neighbor)?;
        self.offset.weights.insert(neighbor.clone(), potential);
        Ok(())
    }
}

impl<F> ProxyFactor<F, UniformWeight> {
    pub fn single_weight(inner: F) -> Self {
        ProxyFactor::new(inner, UniformWeight::default())
    }

    pub fn weight(&self) -> f64 {
        self.offset.weight
    }

    pub fn set_weight<T: Identity>(&mut self, weight: f64) -> FactorResult<()>
    where
        F: Factor<T>,
    {
        let old = self.offset.weight;
        let neighbors = self.inner.neighbors().to_vec();
        for neighbor in &neighbors {
            let stored = self.inner.message(neighbor)?;
            self.inner.receive(rebias(stored, old, weight), neighbor)?;
        }
        self.offset.weight = weight;
        Ok(())
    }
}

impl<T: Identity, F: Factor<T>, X: MessageOffset<T>> Factor<T> for ProxyFactor<F, X> {
    fn core(&self) -> &FactorCore<T> {
        self.inner.core()
    }

    fn core_mut(&mut self) -> &mut FactorCore<T> {
        self.inner.core_mut()
    }

    fn add_neighbor(&mut self, neighbor: T) -> bool {
        self.link_inner(neighbor, |inner, neighbor| Ok(inner.add_neighbor(neighbor)))
            .unwrap_or(false)
    }

    fn remove_neighbor(&mut self, neighbor: &T) -> bool {
        self.offset.forget(neighbor);
        self.inner.remove_neighbor(neighbor)
    }

    fn clear_neighbors(&mut self) {
        self.offset.forget_all();
        self.inner.clear_neighbors()
    }

    fn receive(&mut self, message: f64, sender: &T) -> FactorResult<()> {
        self.inner
            .receive(message + self.offset.offset(sender), sender)
    }

    fn message(&self, neighbor: &T) -> FactorResult<f64> {
        Ok(self.inner.message(neighbor)? - self.offset.offset(neighbor))
    }

    fn send(
        &self,
        message: f64,
        recipient: &T,
        adapter: &mut dyn CommunicationAdapter<T>,
    ) -> FactorResult<()> {
        self.inner
            .send(message + self.offset.offset(recipient), recipient, adapter)
    }

    fn evaluate(&self, assignment: &Assignment<T>) -> FactorResult<f64> {
        let mut value = self.inner.evaluate(assignment)?;
        let core = self.inner.core();
        for neighbor in core.neighbors() {
            if core.is_active(assignment, neighbor)? {
                value += self.offset.offset(neighbor);
            }
        }
        Ok(value)
    }

    fn run(&mut self, adapter: &mut dyn CommunicationAdapter<T>) -> FactorResult<usize> {
        let mut shifted = OffsetAdapter::new(adapter, &self.offset);
        self.inner.run(&mut shifted)
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;
    use crate::factor_types::cardinality::CardinalityFactor;
    use crate::factor_types::factor_type::FactorType;
    use crate::factor_types::selector::SelectorFactor;
    use crate::factor_types::standard::StandardFactor;
    use crate::maxsum::operator::Operator;
    use crate::testing::*;

    fn squared(operator: Operator) -> CardinalityFactor<usize> {
        CardinalityFactor::new(TESTED, operator, |n: usize| (n * n) as f64)
    }

    fn construct_weighting(potentials: &[f64]) -> WeightingFactor<usize, CardinalityFactor<usize>> {
        let mut factor = ProxyFactor::weighting(squared(Operator::Minimize));
        link(&mut factor, potentials.len());
        for (neighbor, potential) in potentials.iter().enumerate() {
            factor.set_potential(&neighbor, *potential).unwrap();
        }
        factor
    }

    #[test]
    fn pass_through_is_transparent() {
        let mut factor = ProxyFactor::pass_through(squared(Operator::Minimize));
        link(&mut factor, 3);
        assert_all_close(&run_with_messages(&mut factor, &[0., 1., 2.]), &[1., 1., 1.]);
        assert_all_close(&run_with_messages(&mut factor, &[3., 1., 2.]), &[1., 1., 1.]);
        assert_eq!(factor.message(&0).unwrap(), 3.);
        assert_eq!(factor.inner().message(&0).unwrap(), 3.);
    }

    #[test]
    fn weights_shift_both_directions() {
        let mut factor = construct_weighting(&[3., 0.]);
        assert_all_close(&run_with_messages(&mut factor, &[0., 1.]), &[4., 1.]);
        assert_eq!(factor.inner().message(&0).unwrap(), 3.);
    }

    #[test]
    fn received_messages_survive_potential_change() {
        let mut factor = construct_weighting(&[0., 0.]);
        factor.receive(2., &0).unwrap();
        factor.set_potential(&0, 3.).unwrap();
        assert_eq!(factor.message(&0).unwrap(), 2.);
        assert_eq!(factor.inner().message(&0).unwrap(), 5.);

        factor.set_potential(&0, -1.).unwrap();
        assert_eq!(factor.message(&0).unwrap(), 2.);
        assert_eq!(factor.inner().message(&0).unwrap(), 1.);
    }

    #[test]
    fn potentials_need_a_neighbor() {
        let mut factor = construct_weighting(&[1.]);
        assert!(factor.set_potential(&7, 1.).is_err());
        factor.remove_neighbor(&0);
        assert!(factor.potential(&0).is_err());
        factor.add_neighbor(0);
        assert_eq!(factor.potential(&0).unwrap(), 0.);
    }

    #[test]
    fn single_weight_applies_to_all() {
        let mut factor = ProxyFactor::single_weight(squared(Operator::Minimize));
        link(&mut factor, 2);
        factor.set_weight(1.).unwrap();
        assert_all_close(&run_with_messages(&mut factor, &[0., 1.]), &[2., 2.]);

        factor.set_weight(0.).unwrap();
        assert_eq!(factor.message(&1).unwrap(), 1.);
        assert_eq!(factor.inner().message(&1).unwrap(), 1.);
    }

    #[test]
    fn weight_set_before_linking_applies_to_new_neighbors() {
        let mut early = ProxyFactor::single_weight(SelectorFactor::new(TESTED, Operator::Maximize));
        early.set_weight(1.).unwrap();
        link(&mut early, 2);
        assert_eq!(early.message(&0).unwrap(), 0.);
        assert_eq!(early.inner().message(&0).unwrap(), 1.);

        let mut late = ProxyFactor::single_weight(SelectorFactor::new(TESTED, Operator::Maximize));
        link(&mut late, 2);
        late.set_weight(1.).unwrap();

        let mut early_adapter = RecordingAdapter::new();
        let mut late_adapter = RecordingAdapter::new();
        early.run(&mut early_adapter).unwrap();
        late.run(&mut late_adapter).unwrap();
        assert_eq!(early_adapter.sent(), late_adapter.sent());
    }

    #[test]
    fn evaluation_adds_active_potentials() {
        let factor = construct_weighting(&[3., 5.]);
        let assignment = Assignment::from([(0, true), (1, false)]);
        assert_eq!(factor.evaluate(&assignment).unwrap(), 1. + 3.);
    }

    #[test]
    fn matches_tabular_factor() {
        cross_check(24, |operator, n_neighbors, rng| {
            let table: Vec<f64> = (0..=n_neighbors)
                .map(|_| rng.random_range(-1.0..1.0))
                .collect();
            let potentials: Vec<f64> = (0..n_neighbors)
                .map(|_| rng.random_range(-1.0..1.0))
                .collect();

            let lookup = table.clone();
            let inner: FactorType<usize> =
                CardinalityFactor::new(TESTED, operator, move |n: usize| lookup[n]).into();
            let mut specific = ProxyFactor::weighting(inner);
            link(&mut specific, n_neighbors);
            for (neighbor, potential) in potentials.iter().enumerate() {
                specific.set_potential(&neighbor, *potential).unwrap();
            }

            let mut reference = StandardFactor::new(TESTED, operator);
            link(&mut reference, n_neighbors);
            reference.set_potential_fn(|active| {
                table[active.count_ones()] + active.iter_ones().map(|i| potentials[i]).sum::<f64>()
            });

            (specific.into(), reference.into())
        });
    }

    #[test]
    fn weighting_mirrors_under_operator_inversion() {
        duality_check(36, |operator, sign, n_neighbors, rng| {
            let table: Vec<f64> = (0..=n_neighbors)
                .map(|_| sign * rng.random_range(-1.0..1.0))
                .collect();
            let inner: FactorType<usize> =
                CardinalityFactor::new(TESTED, operator, move |n: usize| table[n]).into();
            let mut factor = ProxyFactor::weighting(inner);
            link(&mut factor, n_neighbors);
            for neighbor in 0..n_neighbors {
                let potential = sign * rng.random_range(-1.0..1.0);
                factor.set_potential(&neighbor, potential).unwrap();
            }
            factor.into()
        });
    }
}

use log::{debug, trace, warn};
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rayon::prelude::*;

use crate::factor_types::factor_trait::Factor;
use crate::factor_types::factor_type::FactorType;
use crate::graph::solution::Solution;
use crate::maxsum::communication_adapter::{
    ImmediateCommunicationAdapter, MessageRecipients, TickCommunicationAdapter,
};
use crate::maxsum::errors::{FactorError, FactorResult};
use crate::maxsum::operator::Operator;

pub type FactorId = NodeIndex<usize>;
pub type Link = EdgeIndex<usize>;

// A factor slot is only empty while its own factor runs in an immediate round
type Slot = Option<FactorType<FactorId>>;

// Partition of a two-sided factor a new neighbor joins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

/// Factors connected by links. Every link is a binary variable shared by its two end factors,
/// which address each other by their `FactorId`.
pub struct FactorGraph {
    graph: UnGraph<Slot, (), usize>,
    operator: Operator,
}

impl FactorGraph {
    pub fn new(operator: Operator) -> Self {
        FactorGraph {
            graph: UnGraph::default(),
            operator,
        }
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn factor_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn factor_ids(&self) -> impl Iterator<Item = FactorId> + '_ {
        self.graph.node_indices()
    }

    // Every link with its two end factors, in link order
    pub fn links(&self) -> impl Iterator<Item = (Link, FactorId, FactorId)> + '_ {
        self.graph
            .edge_references()
            .map(|edge| (edge.id(), edge.source(), edge.target()))
    }

    pub fn link_between(&self, a: FactorId, b: FactorId) -> Option<Link> {
        self.graph.find_edge(a, b)
    }

    // `build` receives the identity the factor will have in the graph
    pub fn add_factor<F>(&mut self, build: F) -> FactorId
    where
        F: FnOnce(FactorId) -> FactorType<FactorId>,
    {
        let id = self.graph.add_node(None);
        let factor = build(id);
        if factor.operator() != self.operator {
            warn!(
                "Factor {} uses {} in a graph that uses {}",
                factor,
                factor.operator(),
                self.operator
            );
        }
        debug!("Added {}", factor);
        self.graph[id] = Some(factor);
        id
    }

    pub fn factor(&self, id: FactorId) -> FactorResult<&FactorType<FactorId>> {
        self.graph
            .node_weight(id)
            .and_then(Option::as_ref)
            .ok_or_else(|| FactorError::unknown_factor(&id))
    }

    pub fn factor_mut(&mut self, id: FactorId) -> FactorResult<&mut FactorType<FactorId>> {
        self.graph
            .node_weight_mut(id)
            .and_then(Option::as_mut)
            .ok_or_else(|| FactorError::unknown_factor(&id))
    }

    // Links `a` and `b` as neighbors of each other. Linking twice returns the existing link.
    pub fn connect(&mut self, a: FactorId, b: FactorId) -> FactorResult<Link> {
        self.check_endpoints(a, b)?;
        if let Some(link) = self.graph.find_edge(a, b) {
            return Ok(link);
        }
        self.factor_mut(a)?.add_neighbor(b);
        self.factor_mut(b)?.add_neighbor(a);
        Ok(self.add_link(a, b))
    }

    // Like `connect`, but `neighbor` joins the given partition of the two-sided `factor`
    pub fn connect_two_sided(
        &mut self,
        factor: FactorId,
        neighbor: FactorId,
        side: Side,
    ) -> FactorResult<Link> {
        self.check_endpoints(factor, neighbor)?;
        if let Some(link) = self.graph.find_edge(factor, neighbor) {
            return Ok(link);
        }
        let two_sided = self.factor_mut(factor)?;
        match side {
            Side::A => two_sided.add_neighbor_a(neighbor)?,
            Side::B => two_sided.add_neighbor_b(neighbor)?,
        };
        self.factor_mut(neighbor)?.add_neighbor(factor);
        Ok(self.add_link(factor, neighbor))
    }

    fn check_endpoints(&self, a: FactorId, b: FactorId) -> FactorResult<()> {
        self.factor(a)?;
        self.factor(b)?;
        if a == b {
            return Err(FactorError::invalid_neighbor(&a, &b));
        }
        Ok(())
    }

    fn add_link(&mut self, a: FactorId, b: FactorId) -> Link {
        let link = self.graph.add_edge(a, b, ());
        trace!("Linked {:?} and {:?} as {:?}", a, b, link);
        link
    }

    /// Runs every factor in id order, delivering each message as soon as it is sent, so later
    /// factors of the round already see it. Returns the constraint checks performed.
    pub fn run_round_immediate(&mut self) -> FactorResult<usize> {
        let ids: Vec<FactorId> = self.graph.node_indices().collect();
        let mut constraint_checks = 0;
        for id in ids {
            let mut factor = self.graph[id]
                .take()
                .ok_or_else(|| FactorError::unknown_factor(&id))?;
            let outcome = factor.run(&mut ImmediateCommunicationAdapter::new(self));
            self.graph[id] = Some(factor);
            constraint_checks += outcome?;
        }
        Ok(constraint_checks)
    }

    /// Runs every factor on the messages of the previous round, then delivers everything that
    /// was sent.
    pub fn run_round_ticked(&mut self) -> FactorResult<usize> {
        let mut adapter = TickCommunicationAdapter::new();
        let mut constraint_checks = 0;
        for factor in self.graph.node_weights_mut().flatten() {
            constraint_checks += factor.run(&mut adapter)?;
        }
        let delivered = adapter.tick(self)?;
        trace!("Ticked round delivered {} messages", delivered);
        Ok(constraint_checks)
    }

    /// Same round as `run_round_ticked` with the factors spread over the rayon pool. Each
    /// worker buffers its own sends, buffers are merged in factor order before delivery.
    pub fn run_round_parallel(&mut self) -> FactorResult<usize> {
        let outcomes: Vec<FactorResult<(usize, TickCommunicationAdapter<FactorId>)>> = self
            .graph
            .node_weights_mut()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|slot| {
                let mut adapter = TickCommunicationAdapter::new();
                let constraint_checks = match slot {
                    Some(factor) => factor.run(&mut adapter)?,
                    None => 0,
                };
                Ok((constraint_checks, adapter))
            })
            .collect();

        let mut merged = TickCommunicationAdapter::new();
        let mut constraint_checks = 0;
        for outcome in outcomes {
            let (checks, adapter) = outcome?;
            constraint_checks += checks;
            merged.absorb(adapter)?;
        }
        let delivered = merged.tick(self)?;
        trace!("Parallel round delivered {} messages", delivered);
        Ok(constraint_checks)
    }

    // Last message stored at each end of every link, two per link in link order
    pub fn message_snapshot(&self) -> FactorResult<Vec<f64>> {
        let mut snapshot = Vec::with_capacity(2 * self.link_count());
        for (_, a, b) in self.links() {
            snapshot.push(self.factor(a)?.message(&b)?);
            snapshot.push(self.factor(b)?.message(&a)?);
        }
        Ok(snapshot)
    }

    // Sum of every factor's value under `solution`
    pub fn evaluate(&self, solution: &Solution) -> FactorResult<f64> {
        let mut value = 0.;
        for id in self.factor_ids() {
            let assignment = solution.assignment_for(self, id)?;
            value += self.factor(id)?.evaluate(&assignment)?;
        }
        Ok(value)
    }
}

impl MessageRecipients<FactorId> for FactorGraph {
    fn deliver(
        &mut self,
        message: f64,
        sender: &FactorId,
        recipient: &FactorId,
    ) -> FactorResult<()> {
        self.graph
            .node_weight_mut(*recipient)
            .and_then(Option::as_mut)
            .ok_or_else(|| FactorError::unknown_recipient(recipient))?
            .receive(message, sender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factor_types::independent::IndependentFactor;
    use crate::factor_types::proxy::ProxyFactor;
    use crate::factor_types::selector::SelectorFactor;
    use crate::factor_types::two_sided_equality::TwoSidedEqualityFactor;
    use crate::testing::*;

    fn independent(graph: &mut FactorGraph) -> FactorId {
        let operator = graph.operator();
        graph.add_factor(|id| IndependentFactor::new(id, operator).into())
    }

    // Two independent factors around a selector
    fn construct_graph() -> (FactorGraph, FactorId, FactorId, FactorId) {
        let mut graph = FactorGraph::new(Operator::Maximize);
        let low = independent(&mut graph);
        let high = independent(&mut graph);
        let selector = graph.add_factor(|id| SelectorFactor::new(id, Operator::Maximize).into());
        graph.connect(low, selector).unwrap();
        graph.connect(high, selector).unwrap();
        set_potential(&mut graph, low, selector, 2.);
        set_potential(&mut graph, high, selector, 5.);
        (graph, low, high, selector)
    }

    fn set_potential(
        graph: &mut FactorGraph,
        factor: FactorId,
        neighbor: FactorId,
        potential: f64,
    ) {
        match graph.factor_mut(factor).unwrap() {
            FactorType::Independent(factor) => factor.set_potential(&neighbor, potential).unwrap(),
            other => panic!("{} is not independent", other),
        }
    }

    #[test]
    fn connect_links_both_ends() {
        let (graph, low, high, selector) = construct_graph();
        assert_eq!(graph.factor_count(), 3);
        assert_eq!(graph.link_count(), 2);
        assert_eq!(graph.factor(selector).unwrap().neighbors(), &[low, high]);
        assert_eq!(graph.factor(low).unwrap().neighbors(), &[selector]);
        assert_eq!(graph.link_between(selector, high), graph.link_between(high, selector));
    }

    #[test]
    fn connecting_twice_keeps_one_link() {
        let (mut graph, low, _, selector) = construct_graph();
        let first = graph.link_between(low, selector).unwrap();
        assert_eq!(graph.connect(selector, low).unwrap(), first);
        assert_eq!(graph.link_count(), 2);
        assert_eq!(graph.factor(low).unwrap().neighbors().len(), 1);
    }

    #[test]
    fn rejects_bad_endpoints() {
        let (mut graph, low, _, _) = construct_graph();
        let missing = FactorId::new(42);
        assert_eq!(
            graph.connect(low, missing),
            Err(FactorError::unknown_factor(&missing))
        );
        assert!(matches!(
            graph.connect(low, low),
            Err(FactorError::InvalidNeighbor { .. })
        ));
        assert!(graph.factor(missing).is_err());
    }

    #[test]
    fn two_sided_links_join_a_partition() {
        let mut graph = FactorGraph::new(Operator::Minimize);
        let equality =
            graph.add_factor(|id| TwoSidedEqualityFactor::new(id, Operator::Minimize).into());
        let b = independent(&mut graph);
        let a = independent(&mut graph);
        graph.connect_two_sided(equality, b, Side::B).unwrap();
        graph.connect_two_sided(equality, a, Side::A).unwrap();
        assert_eq!(graph.factor(equality).unwrap().neighbors(), &[a, b]);

        let selector = graph.add_factor(|id| SelectorFactor::new(id, Operator::Minimize).into());
        assert!(matches!(
            graph.connect_two_sided(selector, a, Side::A),
            Err(FactorError::UnsupportedOperation { .. })
        ));
        assert_eq!(graph.link_count(), 2);
    }

    #[test]
    fn two_sided_links_reach_through_decorators() {
        let mut graph = FactorGraph::new(Operator::Maximize);
        let weighted = graph.add_factor(|id| {
            let equality = FactorType::from(TwoSidedEqualityFactor::new(id, Operator::Maximize));
            ProxyFactor::weighting(equality).into()
        });
        let b = independent(&mut graph);
        let a = independent(&mut graph);
        graph.connect_two_sided(weighted, b, Side::B).unwrap();
        graph.connect_two_sided(weighted, a, Side::A).unwrap();
        assert_eq!(graph.factor(weighted).unwrap().neighbors(), &[a, b]);
        assert_eq!(graph.factor(a).unwrap().neighbors(), &[weighted]);
    }

    #[test]
    fn ticked_round_uses_previous_messages() {
        init_logging();
        let (mut graph, low, high, selector) = construct_graph();
        graph.run_round_ticked().unwrap();
        // The selector ran before hearing from its neighbors
        assert_eq!(graph.factor(low).unwrap().message(&selector).unwrap(), 0.);
        assert_eq!(graph.factor(selector).unwrap().message(&high).unwrap(), 5.);

        graph.run_round_ticked().unwrap();
        assert_eq!(graph.factor(low).unwrap().message(&selector).unwrap(), -5.);
        assert_eq!(graph.factor(high).unwrap().message(&selector).unwrap(), -2.);
    }

    #[test]
    fn immediate_round_delivers_during_the_round() {
        let (mut graph, low, high, selector) = construct_graph();
        graph.run_round_immediate().unwrap();
        assert_eq!(graph.factor(low).unwrap().message(&selector).unwrap(), -5.);
        assert_eq!(graph.factor(high).unwrap().message(&selector).unwrap(), -2.);
    }

    #[test]
    fn parallel_round_matches_ticked_round() {
        let (mut ticked, ..) = construct_graph();
        let (mut parallel, ..) = construct_graph();
        for _ in 0..3 {
            let expected = ticked.run_round_ticked().unwrap();
            assert_eq!(parallel.run_round_parallel().unwrap(), expected);
            assert_eq!(
                parallel.message_snapshot().unwrap(),
                ticked.message_snapshot().unwrap()
            );
        }
    }

    #[test]
    fn snapshot_has_both_ends_of_each_link() {
        let (mut graph, ..) = construct_graph();
        assert_eq!(graph.message_snapshot().unwrap(), vec![0.; 4]);
        graph.run_round_immediate().unwrap();
        assert_eq!(graph.message_snapshot().unwrap(), vec![-5., 2., -2., 5.]);
    }

    #[test]
    fn delivery_to_unknown_factor_fails() {
        let (mut graph, low, ..) = construct_graph();
        let missing = FactorId::new(9);
        assert_eq!(
            graph.deliver(1., &low, &missing),
            Err(FactorError::unknown_recipient(&missing))
        );
    }
}

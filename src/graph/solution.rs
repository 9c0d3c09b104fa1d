use std::fmt::Display;
use std::ops::Index;

use bitvec::prelude::LocalBits;
use bitvec::vec::BitVec;

use crate::factor_types::factor_trait::{Assignment, Factor};
use crate::graph::factor_graph::{FactorGraph, FactorId, Link};
use crate::maxsum::errors::{FactorError, FactorResult};

pub struct Solution {
    active: BitVec<usize, LocalBits>, // indexed by link
}

impl Solution {
    // Creates a solution with every link inactive
    pub fn new(graph: &FactorGraph) -> Self {
        Solution {
            active: BitVec::repeat(false, graph.link_count()),
        }
    }

    // Decides every link from the messages its ends hold: a link is active iff the two
    // messages add up to something strictly better than 0
    pub fn from_messages(graph: &FactorGraph) -> FactorResult<Self> {
        let operator = graph.operator();
        let mut solution = Solution::new(graph);
        for (link, a, b) in graph.links() {
            let belief = graph.factor(a)?.message(&b)? + graph.factor(b)?.message(&a)?;
            solution.set(link, operator.is_better(belief, 0.));
        }
        Ok(solution)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn is_active(&self, link: Link) -> bool {
        self.active.get(link.index()).is_some_and(|active| *active)
    }

    pub fn set(&mut self, link: Link, active: bool) {
        self.active.set(link.index(), active);
    }

    pub fn count_active(&self) -> usize {
        self.active.count_ones()
    }

    // Values of the links around `factor`, keyed by the neighbor at the other end
    pub fn assignment_for(
        &self,
        graph: &FactorGraph,
        factor: FactorId,
    ) -> FactorResult<Assignment<FactorId>> {
        let mut assignment = Assignment::new();
        for neighbor in graph.factor(factor)?.neighbors() {
            let link = graph
                .link_between(factor, *neighbor)
                .ok_or_else(|| FactorError::invalid_neighbor(&factor, neighbor))?;
            assignment.insert(*neighbor, self.is_active(link));
        }
        Ok(assignment)
    }
}

impl Index<Link> for Solution {
    type Output = bool;

    fn index(&self, link: Link) -> &Self::Output {
        &self.active[link.index()]
    }
}

impl std::fmt::Debug for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.active)
    }
}

impl Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "active links {:?}", self.active.iter_ones().collect::<Vec<_>>())
    }
}

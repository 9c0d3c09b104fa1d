use crate::factor_types::factor_core::FactorCore;
use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::maxsum::errors::{FactorError, FactorResult};
use crate::maxsum::operator::Operator;

// Neighbor list split in two ordered sets: the first `n_elements_a` neighbors form set A and
// the rest form set B. Always 0 <= n_elements_a <= number of neighbors.
#[derive(Debug, Clone)]
pub struct TwoSidedCore<T> {
    core: FactorCore<T>,
    n_elements_a: usize,
}

// (neighbor, last received message)
pub type Pair<T> = (T, f64);

impl<T: Identity> TwoSidedCore<T> {
    pub fn new(identity: T, operator: Operator) -> Self {
        TwoSidedCore {
            core: FactorCore::new(identity, operator),
            n_elements_a: 0,
        }
    }

    pub fn core(&self) -> &FactorCore<T> {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut FactorCore<T> {
        &mut self.core
    }

    pub fn n_elements_a(&self) -> usize {
        self.n_elements_a
    }

    pub fn n_elements_b(&self) -> usize {
        self.core.len() - self.n_elements_a
    }

    // Moves the boundary so that the first `n_elements_a` neighbors form set A
    pub fn set_n_elements_a(&mut self, n_elements_a: usize) -> FactorResult<()> {
        if n_elements_a > self.core.len() {
            return Err(FactorError::InvalidPartition {
                factor: format!("{:?}", self.core.identity()),
                requested: n_elements_a,
                neighbors: self.core.len(),
            });
        }
        self.n_elements_a = n_elements_a;
        Ok(())
    }

    // Inserts at the end of set A
    pub fn add_neighbor_a(&mut self, neighbor: T) -> bool {
        if !self.core.insert_neighbor(self.n_elements_a, neighbor) {
            return false;
        }
        self.n_elements_a += 1;
        true
    }

    // Appends to set B
    pub fn add_neighbor_b(&mut self, neighbor: T) -> bool {
        self.core.add_neighbor(neighbor)
    }

    pub fn remove_neighbor(&mut self, neighbor: &T) -> bool {
        match self.core.remove_neighbor(neighbor) {
            Some(index) => {
                if index < self.n_elements_a {
                    self.n_elements_a -= 1;
                }
                true
            }
            None => false,
        }
    }

    pub fn clear_neighbors(&mut self) {
        self.core.clear_neighbors();
        self.n_elements_a = 0;
    }

    // Both sets sorted best message first (stable, so equal messages keep neighbor order),
    // along with the constraint checks spent, comparisons inside the sort included
    pub fn sorted_pairs(&self) -> FactorResult<(Vec<Pair<T>>, Vec<Pair<T>>, usize)> {
        let neighbors = self.core.neighbors();
        let (set_a, set_b) = neighbors.split_at(self.n_elements_a);
        let (pairs_a, checks_a) = self.sorted(set_a)?;
        let (pairs_b, checks_b) = self.sorted(set_b)?;
        Ok((pairs_a, pairs_b, checks_a + checks_b))
    }

    fn sorted(&self, neighbors: &[T]) -> FactorResult<(Vec<Pair<T>>, usize)> {
        let operator = self.core.operator();
        let mut pairs = neighbors
            .iter()
            .map(|neighbor| {
                self.core
                    .message(neighbor)
                    .map(|message| (neighbor.clone(), message))
            })
            .collect::<FactorResult<Vec<Pair<T>>>>()?;

        let mut checks = pairs.len();
        pairs.sort_by(|a, b| {
            checks += 1;
            operator.compare(b.1, a.1)
        });
        Ok((pairs, checks))
    }

    // |active(A)| - |active(B)|
    pub fn reserve(&self, assignment: &Assignment<T>) -> FactorResult<isize> {
        let flags = self.core.active_flags(assignment)?;
        let (set_a, set_b) = flags.split_at(self.n_elements_a);
        let active_a = set_a.iter().filter(|active| **active).count() as isize;
        let active_b = set_b.iter().filter(|active| **active).count() as isize;
        Ok(active_a - active_b)
    }
}

// Factors whose neighbors are partitioned in sets A and B. Plain `add_neighbor` appends to B.
pub trait TwoSidedFactor<T: Identity>: Factor<T> {
    fn sides(&self) -> &TwoSidedCore<T>;
    fn sides_mut(&mut self) -> &mut TwoSidedCore<T>;

    fn add_neighbor_a(&mut self, neighbor: T) -> bool {
        self.sides_mut().add_neighbor_a(neighbor)
    }

    fn add_neighbor_b(&mut self, neighbor: T) -> bool {
        self.sides_mut().add_neighbor_b(neighbor)
    }

    fn n_elements_a(&self) -> usize {
        self.sides().n_elements_a()
    }

    fn set_n_elements_a(&mut self, n_elements_a: usize) -> FactorResult<()> {
        self.sides_mut().set_n_elements_a(n_elements_a)
    }
}

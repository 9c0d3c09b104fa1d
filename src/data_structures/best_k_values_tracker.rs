use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::data_structures::bounded_tree_set::BoundedTreeSet;
use crate::factor_types::factor_trait::Identity;
use crate::maxsum::operator::Operator;

// Tracked (value, element) pair ordered best-first under its operator, ties broken by element
#[derive(Debug, Clone)]
pub struct Ranked<T> {
    value: f64,
    element: T,
    operator: Operator,
}

impl<T> Ranked<T> {
    pub fn new(value: f64, element: T, operator: Operator) -> Self {
        Ranked {
            value,
            element,
            operator,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn element(&self) -> &T {
        &self.element
    }
}

impl<T: Ord> Ord for Ranked<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.operator
            .compare(other.value, self.value)
            .then_with(|| self.element.cmp(&other.element))
    }
}

impl<T: Ord> PartialOrd for Ranked<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ord> PartialEq for Ranked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Ord> Eq for Ranked<T> {}

impl<T: Hash> Hash for Ranked<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.element.hash(state);
        // -0.0 and 0.0 compare equal, so they must hash equal too
        (self.value + 0.0).to_bits().hash(state);
    }
}

#[derive(Debug, Clone)]
struct TopK<T> {
    sum: f64,                // sum of the k best values
    bound: Option<f64>,      // k-th best value, None while fewer than k values are tracked
    next: Option<Ranked<T>>, // (k+1)-th best entry
}

// Sum of the k best tracked values, plus the same sum with one element taken out (and
// optionally a hypothetical value put in), in O(1) per query after an O(k) precomputation.
#[derive(Debug, Clone)]
pub struct BestKValuesTracker<T> {
    operator: Operator,
    k: usize,
    tracked: BoundedTreeSet<Ranked<T>>,
    top_k: Option<TopK<T>>,
}

impl<T: Identity> BestKValuesTracker<T> {
    pub fn new(operator: Operator, k: usize) -> Self {
        BestKValuesTracker {
            operator,
            k,
            tracked: BoundedTreeSet::new(k + 1),
            top_k: None,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn reset(&mut self) {
        self.tracked.clear();
        self.top_k = None;
    }

    pub fn track(&mut self, element: T, value: f64) {
        self.tracked
            .insert(Ranked::new(value, element, self.operator));
        self.top_k = None;
    }

    // Sum of the k best tracked values (all of them while fewer than k are tracked)
    pub fn sum(&mut self) -> f64 {
        self.precompute().sum
    }

    // Sum of the k best values once `element` (tracked with `value`) is left out. When `extra`
    // is given it competes for a place among the k best, and it always enters while there is
    // a free slot.
    pub fn sum_complementaries(&mut self, element: &T, value: f64, extra: Option<f64>) -> f64 {
        if self.k == 0 {
            return 0.;
        }

        let operator = self.operator;
        let probe = Ranked::new(value, element.clone(), operator);
        let is_tracked = self.tracked.contains(&probe);
        let top_k = self.precompute();

        let mut total = top_k.sum;
        let mut bound = top_k.bound;
        if is_tracked && top_k.next.as_ref() != Some(&probe) {
            total -= value;
            bound = top_k.next.as_ref().map(|next| next.value);
            if let Some(next) = bound {
                total += next;
            }
        }

        if let Some(extra) = extra {
            match bound {
                None => total += extra,
                Some(bound) if operator.is_better(extra, bound) => total += extra - bound,
                Some(_) => {}
            }
        }
        total
    }

    fn precompute(&mut self) -> &TopK<T> {
        let k = self.k;
        let tracked = &self.tracked;
        self.top_k.get_or_insert_with(|| {
            let sum: f64 = tracked.iter().take(k).map(Ranked::value).sum();
            let bound = match k {
                0 => None,
                _ => tracked.iter().nth(k - 1).map(Ranked::value),
            };
            let next = tracked.iter().nth(k).cloned();
            TopK { sum, bound, next }
        })
    }
}

use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::factor_types::factor_core::FactorCore;
use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::FactorResult;
use crate::maxsum::operator::Operator;

// Value of a factor as a function of how many of its neighbors are active
pub trait CardinalityFunction {
    fn evaluate(&self, n_active: usize) -> f64;
}

impl<F: Fn(usize) -> f64> CardinalityFunction for F {
    fn evaluate(&self, n_active: usize) -> f64 {
        self(n_active)
    }
}

pub type SharedCardinalityFunction = Arc<dyn CardinalityFunction + Send + Sync>;

/// Factor whose value only depends on the number of active neighbors.
///
/// Sorting the incoming messages best-first, the best configuration with `m` active neighbors
/// activates the first `m` of them. With prefix sums `S` over the sorted messages this gives,
/// for the neighbor at sorted position `p`:
///  - inactive: best of `f(m) + S[m]` for `m <= p` and of `f(m) + S[m + 1] - v_p` for `m > p`
///  - active: best of `f(m) + S[m - 1]` for `1 <= m <= p + 1` and of `f(m) + S[m] - v_p`
///    for `m > p + 1`
///
/// which are answered from prefix and suffix best tables.
#[derive(Clone)]
pub struct CardinalityFactor<T> {
    core: FactorCore<T>,
    function: SharedCardinalityFunction,
}

impl<T: Identity> CardinalityFactor<T> {
    pub fn new<F>(identity: T, operator: Operator, function: F) -> Self
    where
        F: CardinalityFunction + Send + Sync + 'static,
    {
        CardinalityFactor {
            core: FactorCore::new(identity, operator),
            function: Arc::new(function),
        }
    }

    pub fn function(&self) -> &SharedCardinalityFunction {
        &self.function
    }

    pub fn set_function<F>(&mut self, function: F)
    where
        F: CardinalityFunction + Send + Sync + 'static,
    {
        self.function = Arc::new(function);
    }

    // Running best of `values`, from the front
    fn prefix_best(operator: Operator, values: &[f64]) -> Vec<f64> {
        let mut best = operator.worst_value();
        values
            .iter()
            .map(|value| {
                best = operator.max(best, *value);
                best
            })
            .collect()
    }

    // suffix[i] = best of values[i..], suffix[values.len()] = worst
    fn suffix_best(operator: Operator, values: &[f64]) -> Vec<f64> {
        let mut suffix = vec![operator.worst_value(); values.len() + 1];
        for i in (0..values.len()).rev() {
            suffix[i] = operator.max(suffix[i + 1], values[i]);
        }
        suffix
    }
}

impl<T: fmt::Debug> fmt::Debug for CardinalityFactor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardinalityFactor")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<T: Identity> Factor<T> for CardinalityFactor<T> {
    fn core(&self) -> &FactorCore<T> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FactorCore<T> {
        &mut self.core
    }

    fn evaluate(&self, assignment: &Assignment<T>) -> FactorResult<f64> {
        let n_active = self.core.count_active(assignment)?;
        Ok(self.function.evaluate(n_active))
    }

    fn run(&mut self, adapter: &mut dyn CommunicationAdapter<T>) -> FactorResult<usize> {
        let operator = self.core.operator();
        let n = self.core.len();
        let incoming = self.core.incoming()?;

        let mut constraint_checks = 0;
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|a, b| {
            constraint_checks += 1;
            operator.compare(incoming[*b], incoming[*a])
        });

        let mut prefix_sums = Vec::with_capacity(n + 1);
        prefix_sums.push(0.);
        for index in &order {
            let last = prefix_sums[prefix_sums.len() - 1];
            prefix_sums.push(last + incoming[*index]);
        }

        let f: Vec<f64> = (0..=n).map(|m| self.function.evaluate(m)).collect();
        // m active, all among the first m sorted neighbors
        let first_m: Vec<f64> = (0..=n).map(|m| f[m] + prefix_sums[m]).collect();
        // m active, the first m + 1 sorted neighbors but one
        let skip_one: Vec<f64> = (0..n).map(|m| f[m] + prefix_sums[m + 1]).collect();
        // m >= 1 active, own message left out of the first m
        let own_first: Vec<f64> = (1..=n).map(|m| f[m] + prefix_sums[m - 1]).collect();

        let first_m_prefix = Self::prefix_best(operator, &first_m);
        let first_m_suffix = Self::suffix_best(operator, &first_m);
        let skip_one_suffix = Self::suffix_best(operator, &skip_one);
        let own_first_prefix = Self::prefix_best(operator, &own_first);

        for (position, index) in order.iter().enumerate() {
            let message = incoming[*index];
            let inactive = operator.max(
                first_m_prefix[position],
                skip_one_suffix[position + 1] - message,
            );
            let active = operator.max(
                own_first_prefix[position],
                first_m_suffix[(position + 2).min(n + 1)] - message,
            );
            self.core
                .send(active - inactive, &self.core.neighbors()[*index], adapter)?;
        }
        constraint_checks += 4 * n;

        debug!(
            "Cardinality factor {:?} ran over {} neighbors",
            self.core.identity(),
            n
        );
        Ok(constraint_checks)
    }
}

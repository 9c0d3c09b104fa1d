use std::fmt::{self, Display};

use crate::factor_types::all_active_incentive::AllActiveIncentiveFactor;
use crate::factor_types::at_most_one::AtMostOneFactor;
use crate::factor_types::cardinality::CardinalityFactor;
use crate::factor_types::composite_independent::CompositeIndependentFactor;
use crate::factor_types::conditioned_deactivation::ConditionedDeactivationFactor;
use crate::factor_types::conditioned_selector::ConditionedSelectorFactor;
use crate::factor_types::factor_core::FactorCore;
use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::factor_types::implication::ImplicationFactor;
use crate::factor_types::independent::IndependentFactor;
use crate::factor_types::proxy::{PassThrough, ProxyFactor, SingleWeightFactor, WeightingFactor};
use crate::factor_types::saturation::SaturationFactor;
use crate::factor_types::saturation_k::SaturationKFactor;
use crate::factor_types::selector::SelectorFactor;
use crate::factor_types::standard::StandardFactor;
use crate::factor_types::two_sided::TwoSidedFactor;
use crate::factor_types::two_sided_equality::TwoSidedEqualityFactor;
use crate::factor_types::two_sided_reserve::TwoSidedReserveFactor;
use crate::factor_types::variable::VariableFactor;
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::{FactorError, FactorResult};

type PartitionLink<T> = fn(&mut dyn TwoSidedFactor<T>, T) -> bool;

// Every factor a graph can hold. Decorators wrap another `FactorType`.
#[derive(Debug, Clone)]
pub enum FactorType<T> {
    Standard(StandardFactor<T>),
    Variable(VariableFactor<T>),
    Independent(IndependentFactor<T>),
    Selector(SelectorFactor<T>),
    AtMostOne(AtMostOneFactor<T>),
    Saturation(SaturationFactor<T>),
    SaturationK(SaturationKFactor<T>),
    AllActiveIncentive(AllActiveIncentiveFactor<T>),
    ConditionedSelector(ConditionedSelectorFactor<T>),
    ConditionedDeactivation(ConditionedDeactivationFactor<T>),
    Implication(ImplicationFactor<T>),
    TwoSidedEquality(TwoSidedEqualityFactor<T>),
    TwoSidedReserve(TwoSidedReserveFactor<T>),
    Cardinality(CardinalityFactor<T>),
    Proxy(Box<ProxyFactor<FactorType<T>, PassThrough>>),
    Weighting(Box<WeightingFactor<T, FactorType<T>>>),
    SingleWeight(Box<SingleWeightFactor<FactorType<T>>>),
    CompositeIndependent(Box<CompositeIndependentFactor<T, FactorType<T>>>),
}

macro_rules! match_factor_action {
    ($factor_type:ident, $factor_match:ident, $action:expr) => {
        match $factor_type {
            FactorType::Standard($factor_match) => $action,
            FactorType::Variable($factor_match) => $action,
            FactorType::Independent($factor_match) => $action,
            FactorType::Selector($factor_match) => $action,
            FactorType::AtMostOne($factor_match) => $action,
            FactorType::Saturation($factor_match) => $action,
            FactorType::SaturationK($factor_match) => $action,
            FactorType::AllActiveIncentive($factor_match) => $action,
            FactorType::ConditionedSelector($factor_match) => $action,
            FactorType::ConditionedDeactivation($factor_match) => $action,
            FactorType::Implication($factor_match) => $action,
            FactorType::TwoSidedEquality($factor_match) => $action,
            FactorType::TwoSidedReserve($factor_match) => $action,
            FactorType::Cardinality($factor_match) => $action,
            FactorType::Proxy($factor_match) => $action,
            FactorType::Weighting($factor_match) => $action,
            FactorType::SingleWeight($factor_match) => $action,
            FactorType::CompositeIndependent($factor_match) => $action,
        }
    };
}

macro_rules! impl_from_factor {
    ($($variant:ident($factor:ty)),* $(,)?) => {
        $(
            impl<T: Identity> From<$factor> for FactorType<T> {
                fn from(factor: $factor) -> Self {
                    FactorType::$variant(factor)
                }
            }
        )*
    };
}

macro_rules! impl_from_boxed_factor {
    ($($variant:ident($factor:ty)),* $(,)?) => {
        $(
            impl<T: Identity> From<$factor> for FactorType<T> {
                fn from(factor: $factor) -> Self {
                    FactorType::$variant(Box::new(factor))
                }
            }
        )*
    };
}

impl_from_factor!(
    Standard(StandardFactor<T>),
    Variable(VariableFactor<T>),
    Independent(IndependentFactor<T>),
    Selector(SelectorFactor<T>),
    AtMostOne(AtMostOneFactor<T>),
    Saturation(SaturationFactor<T>),
    SaturationK(SaturationKFactor<T>),
    AllActiveIncentive(AllActiveIncentiveFactor<T>),
    ConditionedSelector(ConditionedSelectorFactor<T>),
    ConditionedDeactivation(ConditionedDeactivationFactor<T>),
    Implication(ImplicationFactor<T>),
    TwoSidedEquality(TwoSidedEqualityFactor<T>),
    TwoSidedReserve(TwoSidedReserveFactor<T>),
    Cardinality(CardinalityFactor<T>),
);

impl_from_boxed_factor!(
    Proxy(ProxyFactor<FactorType<T>, PassThrough>),
    Weighting(WeightingFactor<T, FactorType<T>>),
    SingleWeight(SingleWeightFactor<FactorType<T>>),
    CompositeIndependent(CompositeIndependentFactor<T, FactorType<T>>),
);

impl<T: Identity> FactorType<T> {
    pub fn kind(&self) -> &'static str {
        match self {
            FactorType::Standard(_) => "standard",
            FactorType::Variable(_) => "variable",
            FactorType::Independent(_) => "independent",
            FactorType::Selector(_) => "selector",
            FactorType::AtMostOne(_) => "at-most-one",
            FactorType::Saturation(_) => "saturation",
            FactorType::SaturationK(_) => "saturation-k",
            FactorType::AllActiveIncentive(_) => "all-active-incentive",
            FactorType::ConditionedSelector(_) => "conditioned-selector",
            FactorType::ConditionedDeactivation(_) => "conditioned-deactivation",
            FactorType::Implication(_) => "implication",
            FactorType::TwoSidedEquality(_) => "two-sided-equality",
            FactorType::TwoSidedReserve(_) => "two-sided-reserve",
            FactorType::Cardinality(_) => "cardinality",
            FactorType::Proxy(_) => "proxy",
            FactorType::Weighting(_) => "weighting",
            FactorType::SingleWeight(_) => "single-weight",
            FactorType::CompositeIndependent(_) => "composite-independent",
        }
    }

    // Bare partitioned factors, seen through their partition interface. The partition helpers
    // below also look through decorators.
    pub fn as_two_sided_mut(&mut self) -> Option<&mut dyn TwoSidedFactor<T>> {
        match self {
            FactorType::TwoSidedEquality(factor) => Some(factor as &mut dyn TwoSidedFactor<T>),
            FactorType::TwoSidedReserve(factor) => Some(factor as &mut dyn TwoSidedFactor<T>),
            _ => None,
        }
    }

    pub fn add_neighbor_a(&mut self, neighbor: T) -> FactorResult<bool> {
        self.link_partition(neighbor, "add_neighbor_a", |factor, neighbor| {
            factor.add_neighbor_a(neighbor)
        })
    }

    pub fn add_neighbor_b(&mut self, neighbor: T) -> FactorResult<bool> {
        self.link_partition(neighbor, "add_neighbor_b", |factor, neighbor| {
            factor.add_neighbor_b(neighbor)
        })
    }

    pub fn set_n_elements_a(&mut self, n_elements_a: usize) -> FactorResult<()> {
        let identity = self.identity().clone();
        match self {
            FactorType::Proxy(factor) => factor.inner_mut().set_n_elements_a(n_elements_a),
            FactorType::Weighting(factor) => factor.inner_mut().set_n_elements_a(n_elements_a),
            FactorType::SingleWeight(factor) => factor.inner_mut().set_n_elements_a(n_elements_a),
            FactorType::CompositeIndependent(factor) => {
                factor.inner_mut().set_n_elements_a(n_elements_a)
            }
            other => match other.as_two_sided_mut() {
                Some(factor) => factor.set_n_elements_a(n_elements_a),
                None => Err(FactorError::unsupported(&identity, "set_n_elements_a")),
            },
        }
    }

    // Decorators link the neighbor to their inner factor so they keep their own bookkeeping
    fn link_partition(
        &mut self,
        neighbor: T,
        operation: &'static str,
        link: PartitionLink<T>,
    ) -> FactorResult<bool> {
        let identity = self.identity().clone();
        let relink = |inner: &mut FactorType<T>, neighbor: T| {
            inner.link_partition(neighbor, operation, link)
        };
        match self {
            FactorType::Proxy(factor) => factor.link_inner(neighbor, relink),
            FactorType::Weighting(factor) => factor.link_inner(neighbor, relink),
            FactorType::SingleWeight(factor) => factor.link_inner(neighbor, relink),
            FactorType::CompositeIndependent(factor) => factor.link_inner(neighbor, relink),
            other => match other.as_two_sided_mut() {
                Some(factor) => Ok(link(factor, neighbor)),
                None => Err(FactorError::unsupported(&identity, operation)),
            },
        }
    }
}

impl<T: Identity> Factor<T> for FactorType<T> {
    fn core(&self) -> &FactorCore<T> {
        match_factor_action!(self, factor, factor.core())
    }

    fn core_mut(&mut self) -> &mut FactorCore<T> {
        match_factor_action!(self, factor, factor.core_mut())
    }

    fn add_neighbor(&mut self, neighbor: T) -> bool {
        match_factor_action!(self, factor, factor.add_neighbor(neighbor))
    }

    fn remove_neighbor(&mut self, neighbor: &T) -> bool {
        match_factor_action!(self, factor, factor.remove_neighbor(neighbor))
    }

    fn clear_neighbors(&mut self) {
        match_factor_action!(self, factor, factor.clear_neighbors())
    }

    fn receive(&mut self, message: f64, sender: &T) -> FactorResult<()> {
        match_factor_action!(self, factor, factor.receive(message, sender))
    }

    fn message(&self, neighbor: &T) -> FactorResult<f64> {
        match_factor_action!(self, factor, factor.message(neighbor))
    }

    fn send(
        &self,
        message: f64,
        recipient: &T,
        adapter: &mut dyn CommunicationAdapter<T>,
    ) -> FactorResult<()> {
        match_factor_action!(self, factor, factor.send(message, recipient, adapter))
    }

    fn evaluate(&self, assignment: &Assignment<T>) -> FactorResult<f64> {
        match_factor_action!(self, factor, factor.evaluate(assignment))
    }

    fn run(&mut self, adapter: &mut dyn CommunicationAdapter<T>) -> FactorResult<usize> {
        match_factor_action!(self, factor, factor.run(adapter))
    }
}

impl<T: Identity> Display for FactorType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} factor {:?} with {} neighbors",
            self.kind(),
            self.identity(),
            self.neighbors().len()
        )
    }
}

pub mod data_structures {
    pub mod best_k_values_tracker;
    pub mod best_values_tracker;
    pub mod bounded_tree_set;
}

pub mod maxsum {
    pub mod communication_adapter;
    pub mod errors;
    pub mod operator;
}

pub mod factor_types {
    pub mod all_active_incentive;
    pub mod at_most_one;
    pub mod cardinality;
    pub mod composite_independent;
    pub mod conditioned_deactivation;
    pub mod conditioned_selector;
    pub mod factor_core;
    pub mod factor_trait;
    pub mod factor_type;
    pub mod implication;
    pub mod independent;
    pub mod proxy;
    pub mod saturation;
    pub mod saturation_k;
    pub mod selector;
    pub mod standard;
    pub mod two_sided;
    pub mod two_sided_equality;
    pub mod two_sided_reserve;
    pub mod variable;
}

pub mod graph {
    pub mod factor_graph;
    pub mod solution;
    pub mod solver;
}

#[cfg(test)]
pub(crate) mod testing;

pub use factor_types::{
    factor_trait::{Assignment, Factor, Identity},
    factor_type::FactorType,
};
pub use graph::{
    factor_graph::{FactorGraph, FactorId, Link, Side},
    solution::Solution,
    solver::{MaxSumSolver, Schedule, Solver, SolverOptions, SolverReport},
};
pub use maxsum::{
    communication_adapter::{
        CommunicationAdapter, ImmediateCommunicationAdapter, MessageRecipients,
        TickCommunicationAdapter,
    },
    errors::{FactorError, FactorResult},
    operator::Operator,
};

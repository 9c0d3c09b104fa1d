use std::time::Instant;

use log::info;
use maxsum_rust::factor_types::cardinality::CardinalityFactor;
use maxsum_rust::factor_types::composite_independent::CompositeIndependentFactor;
use maxsum_rust::factor_types::selector::SelectorFactor;
use maxsum_rust::{
    Factor, FactorError, FactorGraph, FactorId, FactorResult, FactorType, MaxSumSolver, Operator,
    SolverOptions,
};

// utility of agent i for target j
const UTILITIES: [[f64; 2]; 2] = [[0.017, 10.01], [0.1, 1.599]];

// Every agent picks exactly one target and every target takes at most one agent
fn build_assignment_problem(
    operator: Operator,
) -> FactorResult<(FactorGraph, Vec<FactorId>, Vec<FactorId>)> {
    let mut graph = FactorGraph::new(operator);

    let agents: Vec<FactorId> = UTILITIES
        .iter()
        .map(|_| {
            graph.add_factor(|id| {
                let selector = FactorType::from(SelectorFactor::new(id, operator));
                CompositeIndependentFactor::new(selector).into()
            })
        })
        .collect();

    let worst = operator.worst_value();
    let targets: Vec<FactorId> = UTILITIES[0]
        .iter()
        .map(|_| {
            graph.add_factor(|id| {
                let at_most_one = move |n: usize| if n <= 1 { 0. } else { worst };
                CardinalityFactor::new(id, operator, at_most_one).into()
            })
        })
        .collect();

    for (agent, utilities) in agents.iter().zip(UTILITIES) {
        for (target, utility) in targets.iter().zip(utilities) {
            graph.connect(*agent, *target)?;
            match graph.factor_mut(*agent)? {
                FactorType::CompositeIndependent(factor) => factor.set_potential(target, utility)?,
                other => return Err(FactorError::unsupported(other.identity(), "set_potential")),
            }
        }
    }

    Ok((graph, agents, targets))
}

fn main() -> FactorResult<()> {
    // change "info" to "debug" for debug-level logging, etc.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let time_start = Instant::now();
    let (mut graph, agents, targets) = build_assignment_problem(Operator::Maximize)?;
    info!(
        "Assignment problem constructed. Elapsed time {:?}.",
        time_start.elapsed()
    );

    let options = SolverOptions::default();
    let (solution, report) = MaxSumSolver::solve(&mut graph, &options)?;

    for (index, agent) in agents.iter().enumerate() {
        for (target_index, target) in targets.iter().enumerate() {
            if let Some(link) = graph.link_between(*agent, *target) {
                if solution[link] {
                    info!("Agent {} takes target {}.", index, target_index);
                }
            }
        }
    }
    info!(
        "Objective {} after {} iterations (converged: {}).",
        report.objective, report.iterations, report.converged
    );

    Ok(())
}

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::graph::factor_graph::FactorGraph;
use crate::graph::solution::Solution;
use crate::maxsum::errors::FactorResult;

// How the factors of one round see each other's messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Schedule {
    // Sequential, each message delivered as soon as it is sent
    Immediate,
    // Synchronous rounds, every factor reads the previous round's messages
    #[default]
    Ticked,
    // Ticked rounds with the factors run on the rayon pool
    Parallel,
}

#[derive(Debug, Clone)]
pub struct SolverOptions {
    max_iterations: usize,
    time_max: Duration,
    eps: f64, // largest message change that still counts as converged
    schedule: Schedule,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            max_iterations: 1000,
            time_max: Duration::new(60, 0), // 1 minute
            eps: 1e-9,
            schedule: Schedule::default(),
        }
    }
}

impl SolverOptions {
    pub fn set_max_iterations(&mut self, value: usize) -> &mut Self {
        self.max_iterations = value;
        self
    }

    pub fn set_time_max(&mut self, value: Duration) -> &mut Self {
        self.time_max = value;
        self
    }

    pub fn set_eps(&mut self, value: f64) -> &mut Self {
        self.eps = value;
        self
    }

    pub fn set_schedule(&mut self, value: Schedule) -> &mut Self {
        self.schedule = value;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn time_max(&self) -> Duration {
        self.time_max
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }
}

#[derive(Debug, Clone, Default)]
pub struct SolverReport {
    pub iterations: usize,
    pub converged: bool,
    pub constraint_checks: usize,
    pub elapsed: Duration,
    pub objective: f64, // value of the final solution
}

pub trait Solver<'a> {
    fn init(graph: &'a mut FactorGraph) -> Self;
    fn run(self, options: &SolverOptions) -> FactorResult<Self>
    where
        Self: Sized;
}

pub struct MaxSumSolver<'a> {
    graph: &'a mut FactorGraph,
    report: SolverReport,
    solution: Option<Solution>,
}

impl<'a> MaxSumSolver<'a> {
    // Runs rounds on `graph` until its messages settle or a limit is hit
    pub fn solve(
        graph: &'a mut FactorGraph,
        options: &SolverOptions,
    ) -> FactorResult<(Solution, SolverReport)> {
        let solver = MaxSumSolver::init(graph).run(options)?;
        let solution = match solver.solution {
            Some(solution) => solution,
            None => Solution::from_messages(solver.graph)?,
        };
        Ok((solution, solver.report))
    }

    pub fn report(&self) -> &SolverReport {
        &self.report
    }

    // Solution decided after the last run, if any
    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    fn run_round(&mut self, schedule: Schedule) -> FactorResult<usize> {
        match schedule {
            Schedule::Immediate => self.graph.run_round_immediate(),
            Schedule::Ticked => self.graph.run_round_ticked(),
            Schedule::Parallel => self.graph.run_round_parallel(),
        }
    }
}

// Largest change between two snapshots, identical values (infinities included) count as 0
fn max_delta(previous: &[f64], current: &[f64]) -> f64 {
    previous
        .iter()
        .zip(current)
        .map(|(p, c)| if p == c { 0. } else { (p - c).abs() })
        .map(|delta| if delta.is_nan() { f64::INFINITY } else { delta })
        .fold(0., f64::max)
}

impl<'a> Solver<'a> for MaxSumSolver<'a> {
    fn init(graph: &'a mut FactorGraph) -> Self {
        MaxSumSolver {
            graph,
            report: SolverReport::default(),
            solution: None,
        }
    }

    fn run(mut self, options: &SolverOptions) -> FactorResult<Self> {
        let time_start = Instant::now();
        let mut report = SolverReport::default();
        let mut previous = self.graph.message_snapshot()?;

        info!(
            "Max-sum on {} factors and {} links, {:?} schedule",
            self.graph.factor_count(),
            self.graph.link_count(),
            options.schedule()
        );

        loop {
            report.constraint_checks += self.run_round(options.schedule())?;
            report.iterations += 1;

            let current = self.graph.message_snapshot()?;
            let delta = max_delta(&previous, &current);
            let elapsed_time = time_start.elapsed();
            debug!(
                "Iteration {}. Elapsed time {:?}. Largest message change {}.",
                report.iterations, elapsed_time, delta
            );

            if delta <= options.eps() {
                info!("Messages changed less than epsilon. Converged.");
                report.converged = true;
                break;
            }

            if report.iterations >= options.max_iterations() {
                warn!("Maximum number of iterations reached. Interrupting.");
                break;
            }

            if elapsed_time >= options.time_max() {
                warn!("Time limit reached. Interrupting.");
                break;
            }

            previous = current;
        }

        let solution = Solution::from_messages(self.graph)?;
        report.objective = self.graph.evaluate(&solution)?;
        report.elapsed = time_start.elapsed();
        info!(
            "Max-sum finished after {} iterations. Elapsed time {:?}. Objective {}. Solution {}.",
            report.iterations, report.elapsed, report.objective, solution
        );

        self.report = report;
        self.solution = Some(solution);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factor_types::cardinality::CardinalityFactor;
    use crate::factor_types::composite_independent::CompositeIndependentFactor;
    use crate::factor_types::factor_type::FactorType;
    use crate::factor_types::independent::IndependentFactor;
    use crate::factor_types::selector::SelectorFactor;
    use crate::graph::factor_graph::FactorId;
    use crate::maxsum::operator::Operator;
    use crate::testing::*;

    const UTILITIES: [[f64; 2]; 2] = [[0.017, 10.01], [0.1, 1.599]];

    // Every agent picks exactly one target, every target takes at most one agent
    fn construct_assignment() -> (FactorGraph, Vec<FactorId>, Vec<FactorId>) {
        let operator = Operator::Maximize;
        let mut graph = FactorGraph::new(operator);
        let agents: Vec<FactorId> = (0..UTILITIES.len())
            .map(|_| {
                graph.add_factor(|id| {
                    let selector = FactorType::from(SelectorFactor::new(id, operator));
                    CompositeIndependentFactor::new(selector).into()
                })
            })
            .collect();
        let targets: Vec<FactorId> = (0..UTILITIES[0].len())
            .map(|_| {
                graph.add_factor(|id| {
                    CardinalityFactor::new(id, operator, |n: usize| {
                        if n <= 1 {
                            0.
                        } else {
                            f64::NEG_INFINITY
                        }
                    })
                    .into()
                })
            })
            .collect();

        for (agent, utilities) in agents.iter().zip(UTILITIES) {
            for (target, utility) in targets.iter().zip(utilities) {
                graph.connect(*agent, *target).unwrap();
                match graph.factor_mut(*agent).unwrap() {
                    FactorType::CompositeIndependent(factor) => {
                        factor.set_potential(target, utility).unwrap()
                    }
                    other => panic!("unexpected {}", other),
                }
            }
        }
        (graph, agents, targets)
    }

    // Two independent factors worth 2 and 5 around a selector
    fn construct_choice() -> FactorGraph {
        let operator = Operator::Maximize;
        let mut graph = FactorGraph::new(operator);
        let mut sides = Vec::new();
        for potential in [2., 5.] {
            let id = graph.add_factor(|id| IndependentFactor::new(id, operator).into());
            sides.push((id, potential));
        }
        let selector = graph.add_factor(|id| SelectorFactor::new(id, operator).into());
        for (id, potential) in sides {
            graph.connect(id, selector).unwrap();
            if let FactorType::Independent(factor) = graph.factor_mut(id).unwrap() {
                factor.set_potential(&selector, potential).unwrap();
            }
        }
        graph
    }

    fn options(schedule: Schedule, max_iterations: usize) -> SolverOptions {
        let mut options = SolverOptions::default();
        options
            .set_schedule(schedule)
            .set_max_iterations(max_iterations);
        options
    }

    #[test]
    fn default_options() {
        let options = SolverOptions::default();
        assert_eq!(options.max_iterations(), 1000);
        assert_eq!(options.time_max(), Duration::from_secs(60));
        assert_eq!(options.eps(), 1e-9);
        assert_eq!(options.schedule(), Schedule::Ticked);
    }

    #[test]
    fn assigns_agents_to_distinct_targets() {
        init_logging();
        let (mut graph, agents, targets) = construct_assignment();
        let (solution, report) =
            MaxSumSolver::solve(&mut graph, &options(Schedule::Ticked, 10)).unwrap();

        assert_eq!(report.iterations, 10);
        assert!(!report.converged);
        assert!(report.constraint_checks > 0);
        assert_close(report.objective, 10.01 + 0.1);

        let chosen = |agent: usize, target: usize| {
            solution[graph.link_between(agents[agent], targets[target]).unwrap()]
        };
        assert!(!chosen(0, 0));
        assert!(chosen(0, 1));
        assert!(chosen(1, 0));
        assert!(!chosen(1, 1));
    }

    #[test]
    fn parallel_schedule_matches_ticked() {
        let (mut ticked, ..) = construct_assignment();
        let (mut parallel, ..) = construct_assignment();
        let (ticked_solution, ticked_report) =
            MaxSumSolver::solve(&mut ticked, &options(Schedule::Ticked, 7)).unwrap();
        let (parallel_solution, parallel_report) =
            MaxSumSolver::solve(&mut parallel, &options(Schedule::Parallel, 7)).unwrap();

        assert_eq!(parallel_solution.to_string(), ticked_solution.to_string());
        assert_eq!(parallel_report.constraint_checks, ticked_report.constraint_checks);
        assert_eq!(
            parallel.message_snapshot().unwrap(),
            ticked.message_snapshot().unwrap()
        );
    }

    #[test]
    fn ticked_rounds_converge() {
        let mut graph = construct_choice();
        let solver = MaxSumSolver::init(&mut graph)
            .run(&options(Schedule::Ticked, 100))
            .unwrap();
        let report = solver.report();
        assert!(report.converged);
        assert_eq!(report.iterations, 3);
        assert_eq!(report.objective, 5.);
        assert_eq!(solver.solution().unwrap().count_active(), 1);
    }

    #[test]
    fn immediate_rounds_converge_sooner() {
        let mut graph = construct_choice();
        let (solution, report) =
            MaxSumSolver::solve(&mut graph, &options(Schedule::Immediate, 100)).unwrap();
        assert!(report.converged);
        assert_eq!(report.iterations, 2);
        assert_eq!(solution.to_string(), "active links [1]");
    }

    #[test]
    fn iteration_limit_stops_before_convergence() {
        let mut graph = construct_choice();
        let (_, report) = MaxSumSolver::solve(&mut graph, &options(Schedule::Ticked, 1)).unwrap();
        assert_eq!(report.iterations, 1);
        assert!(!report.converged);
    }

    #[test]
    fn equal_infinities_do_not_count_as_change() {
        let previous = [f64::INFINITY, 1., f64::NEG_INFINITY];
        assert_eq!(max_delta(&previous, &previous), 0.);
        assert_eq!(max_delta(&[1., 2.], &[1.5, 0.]), 2.);
        assert_eq!(max_delta(&[1.], &[f64::INFINITY]), f64::INFINITY);
    }
}

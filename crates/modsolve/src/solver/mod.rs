//! SAT-based selection of load options.
//!
//! Rules of a sealed [`Graph`](crate::context::Graph) are lowered into CNF
//! clauses over one boolean variable per option and handed to a CDCL
//! (Conflict-Driven Clause Learning) solver.
//!
//! # Architecture
//!
//! - [`LoweredProblem`]: every rule's clauses, computed once per graph
//! - [`ClauseSet`]: deduplicated clauses with their originating rule
//! - [`Decisions`]: the assignment trail with levels and reasons
//! - [`Policy`]: the order in which undecided options are tried
//! - [`Solver`]: the CDCL loop
//!
//! # Algorithm Overview
//!
//! 1. **Lowering**: each rule becomes one or more clauses
//! 2. **Assertions**: unit clauses are decided at level 0
//! 3. **Decision Making**: the preferred undecided option is tried as loaded
//! 4. **Unit Propagation**: two watched literals per clause
//! 5. **Conflict Analysis**: learn a first-UIP clause and backjump
//!
//! Solving is deterministic: the same graph always yields the same selection.

mod clause;
mod clause_set;
mod decisions;
mod lowering;
mod policy;
mod solver;
mod watch_graph;

#[cfg(test)]
mod tests;

pub use clause::{Clause, ClauseOrigin};
pub use clause_set::ClauseSet;
pub use decisions::Decisions;
pub use lowering::LoweredProblem;
pub use policy::Policy;
pub use solver::{SolveOutcome, Solver, SolverStats};
pub use watch_graph::WatchGraph;

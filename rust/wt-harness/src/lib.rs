//! wt-harness: differential testing and work/span profiling for parallel
//! algorithm solvers.
//!
//! Each trial generates a random instance for one algorithm family, runs an
//! external solver on it, checks the answer against a sequential oracle, and
//! records the work and span the solver reports. Sweeps repeat this over a
//! range of sizes (or fan-outs) and emit a performance series.
//!
//! Families: circular-list traversal, cycle coloring, maximum, merge of two
//! sorted arrays, p-ary search, and upper hull (solved twice to get both
//! halves of the convex hull).

pub mod accumulator;
pub mod config;
pub mod error;
pub mod family;
pub mod generator;
pub mod geometry;
pub mod oracle;
pub mod orchestrator;
pub mod report;
pub mod solver;
pub mod validator;
pub mod wire;

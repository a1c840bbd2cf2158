//! Compile a set of C kernel variants, run each one on a fixed input and
//! report what it printed.

pub mod build;
pub mod cli;
pub mod env;
pub mod exit;
pub mod report;
pub mod run;
pub mod tokenize;

pub use build::{BuildOutcome, BuildStatus, BuildTarget, Builder};
pub use env::ExecutionEnvironment;
pub use report::{LineReporter, Reporter};
pub use run::{ExecutionResult, InvocationSpec, RunError, Runner, Stage};

//! Compiles each kernel variant before anything is run.
//!
//! Compile failures never stop the harness: every target gets its own
//! [`BuildOutcome`] and the caller decides whether to look at it.

use std::{fmt::Display, process::Command, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

use crate::{env::ExecutionEnvironment, exit::Exit};

pub const DEFAULT_COMPILER: &str = "gcc";
pub const DEFAULT_CFLAGS: &str = "-O3 -fopenmp -msse4";

const DEFAULT_TARGETS: [(&str, &str); 3] = [
    ("conv-harness_David.c", "./conv-harness_David"),
    ("conv-harness_SSE.c", "./conv-harness_SSE"),
    (
        "conv-harness_OpenMP_Without_If.c",
        "./conv-harness_OpenMP_Without_If",
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    pub source_path: String,
    pub binary_path: String,
}

impl BuildTarget {
    pub fn new(source_path: impl Into<String>, binary_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            binary_path: binary_path.into(),
        }
    }

    pub fn defaults() -> Vec<Self> {
        DEFAULT_TARGETS
            .iter()
            .map(|(src, bin)| Self::new(*src, *bin))
            .collect()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("expected SOURCE=BINARY, got `{0}`")]
pub struct ParseTargetError(String);

impl FromStr for BuildTarget {
    type Err = ParseTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((src, bin)) if !src.trim().is_empty() && !bin.trim().is_empty() => {
                Ok(Self::new(src.trim(), bin.trim()))
            }
            _ => Err(ParseTargetError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("compiler `{0}` not found")]
    CompilerNotFound(String),
    #[error("failed to launch compiler `{compiler}`: {source}")]
    NotLaunched {
        compiler: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub enum BuildStatus {
    Built,
    Failed(Exit),
    NotLaunched(BuildError),
}

impl Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Built => write!(f, "built"),
            Self::Failed(exit) => write!(f, "compiler failed with {}", exit),
            Self::NotLaunched(err) => write!(f, "{}", err),
        }
    }
}

#[derive(Debug)]
pub struct BuildOutcome {
    pub target: BuildTarget,
    pub status: BuildStatus,
}

impl BuildOutcome {
    pub fn is_built(&self) -> bool {
        matches!(self.status, BuildStatus::Built)
    }
}

#[derive(Debug, Clone)]
pub struct Builder {
    pub compiler: String,
    pub flags: Vec<String>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            compiler: DEFAULT_COMPILER.to_string(),
            flags: DEFAULT_CFLAGS.split_whitespace().map(String::from).collect(),
        }
    }
}

impl Builder {
    pub fn new(compiler: impl Into<String>, flags: Vec<String>) -> Self {
        Self {
            compiler: compiler.into(),
            flags,
        }
    }

    /// `<compiler> <flags...> <source> -o <binary>`, without the program.
    pub fn compile_args(&self, target: &BuildTarget) -> Vec<String> {
        let mut args = self.flags.clone();
        args.push(target.source_path.clone());
        args.extend(["-o".to_string(), target.binary_path.clone()]);
        args
    }

    /// Attempts every target once, in order.
    pub fn build_all(&self, env: &ExecutionEnvironment, targets: &[BuildTarget]) -> Vec<BuildOutcome> {
        targets
            .iter()
            .map(|target| BuildOutcome {
                target: target.clone(),
                status: self.build(env, target),
            })
            .collect()
    }

    fn build(&self, env: &ExecutionEnvironment, target: &BuildTarget) -> BuildStatus {
        let args = self.compile_args(target);
        info!("{} {}", self.compiler, args.join(" "));

        let Some(program) = env.resolve_program(&self.compiler) else {
            let err = BuildError::CompilerNotFound(self.compiler.clone());
            warn!(source = %target.source_path, "{}", err);
            return BuildStatus::NotLaunched(err);
        };

        let mut cmd = Command::new(program);
        cmd.args(&args);
        env.apply(&mut cmd);

        match cmd.status() {
            Ok(status) if status.success() => BuildStatus::Built,
            Ok(status) => {
                let exit = Exit::from(status);
                warn!(source = %target.source_path, "compile failed: {}", exit);
                BuildStatus::Failed(exit)
            }
            Err(source) => {
                let err = BuildError::NotLaunched {
                    compiler: self.compiler.clone(),
                    source,
                };
                warn!(source = %target.source_path, "{}", err);
                BuildStatus::NotLaunched(err)
            }
        }
    }
}

//! Spawns each built binary and captures its combined stdout/stderr.

use std::{
    fmt::Display,
    io::{self, Read},
    os::unix::process::CommandExt,
    process::{Command, Stdio},
    time::{Duration, Instant},
};

use thiserror::Error;
use tracing::{debug, info};

use crate::{
    build::{BuildOutcome, BuildTarget},
    env::ExecutionEnvironment,
    exit::Exit,
    report::Reporter,
    tokenize::{self, TokenizeError},
};

pub const DEFAULT_ARGS: &str = "16 16 1 32 32 20";

#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot tokenize `{line}`: {source}")]
    Tokenize {
        line: String,
        #[source]
        source: TokenizeError,
    },
    #[error("empty command line")]
    EmptyCommand,
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to capture output: {source}")]
    Capture {
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    NotStarted,
    Spawned,
    Terminated { succeeded: bool },
    Reported,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "Not started"),
            Self::Spawned => write!(f, "Running"),
            Self::Terminated { succeeded: true } => write!(f, "Done"),
            Self::Terminated { succeeded: false } => write!(f, "Failed"),
            Self::Reported => write!(f, "Reported"),
        }
    }
}

/// Fully resolved command line for one binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSpec {
    pub executable_path: String,
    pub argument_list: Vec<String>,
}

impl InvocationSpec {
    /// Tokenizes `binary + " " + args`, so a binary path with spaces splits
    /// exactly as it would on a shell line.
    pub fn new(binary_path: &str, args: &str) -> Result<Self, RunError> {
        let line = format!("{} {}", binary_path, args);
        let mut argv = tokenize::split(&line).map_err(|source| RunError::Tokenize {
            line: line.clone(),
            source,
        })?;
        if argv.is_empty() {
            return Err(RunError::EmptyCommand);
        }
        let executable_path = argv.remove(0);
        Ok(Self {
            executable_path,
            argument_list: argv,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub target_label: String,
    pub captured_text: String,
    pub succeeded: bool,
    pub exit: Option<Exit>,
    pub elapsed: Duration,
}

impl ExecutionResult {
    fn failed(target_label: &str, err: impl Display, elapsed: Duration) -> Self {
        Self {
            target_label: target_label.to_string(),
            captured_text: err.to_string(),
            succeeded: false,
            exit: None,
            elapsed,
        }
    }
}

/// One target moving through `NotStarted → Spawned → Terminated → Reported`.
#[derive(Debug)]
pub struct Run {
    pub label: String,
    pub stage: Stage,
}

impl Run {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            stage: Stage::NotStarted,
        }
    }

    fn advance(&mut self, stage: Stage) {
        debug!(target_label = %self.label, "{} -> {}", self.stage, stage);
        self.stage = stage;
    }
}

#[derive(Debug, Clone)]
pub struct Runner {
    pub args: String,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(DEFAULT_ARGS)
    }
}

impl Runner {
    pub fn new(args: impl Into<String>) -> Self {
        Self { args: args.into() }
    }

    /// Runs `target` to completion. Spawn failures and abnormal exits both come
    /// back as `succeeded == false`; nothing here aborts the harness.
    pub fn execute(&self, env: &ExecutionEnvironment, target: &BuildTarget) -> ExecutionResult {
        self.execute_tracked(env, target, &mut Run::new(&target.binary_path))
    }

    /// Executes and reports every target in declaration order. When `builds`
    /// is given, targets whose build did not succeed are reported as failed
    /// without being spawned.
    pub fn run_all<R: Reporter>(
        &self,
        env: &ExecutionEnvironment,
        targets: &[BuildTarget],
        builds: Option<&[BuildOutcome]>,
        reporter: &mut R,
    ) -> io::Result<Vec<Run>> {
        let mut runs = Vec::with_capacity(targets.len());
        for (i, target) in targets.iter().enumerate() {
            let mut run = Run::new(&target.binary_path);
            let blocked = builds.and_then(|outcomes| outcomes.get(i)).filter(|b| !b.is_built());

            let result = match blocked {
                Some(outcome) => {
                    let result = ExecutionResult::failed(
                        &target.binary_path,
                        format_args!("build failed: {}", outcome.status),
                        Duration::ZERO,
                    );
                    run.advance(Stage::Terminated { succeeded: false });
                    result
                }
                None => self.execute_tracked(env, target, &mut run),
            };

            reporter.report(&result)?;
            run.advance(Stage::Reported);
            runs.push(run);
        }
        Ok(runs)
    }

    fn execute_tracked(
        &self,
        env: &ExecutionEnvironment,
        target: &BuildTarget,
        run: &mut Run,
    ) -> ExecutionResult {
        let start = Instant::now();
        let result = match InvocationSpec::new(&target.binary_path, &self.args) {
            Ok(spec) => match self.spawn_and_capture(env, &spec, run) {
                Ok((text, exit)) => ExecutionResult {
                    target_label: target.binary_path.clone(),
                    captured_text: text,
                    succeeded: exit.success(),
                    exit: Some(exit),
                    elapsed: start.elapsed(),
                },
                Err(err) => ExecutionResult::failed(&target.binary_path, err, start.elapsed()),
            },
            Err(err) => ExecutionResult::failed(&target.binary_path, err, start.elapsed()),
        };

        match result.exit {
            Some(exit) => info!(target_label = %result.target_label, elapsed = ?result.elapsed, "{}", exit),
            None => info!(target_label = %result.target_label, "not run: {}", result.captured_text),
        }
        run.advance(Stage::Terminated {
            succeeded: result.succeeded,
        });
        result
    }

    fn spawn_and_capture(
        &self,
        env: &ExecutionEnvironment,
        spec: &InvocationSpec,
        run: &mut Run,
    ) -> Result<(String, Exit), RunError> {
        let spawn_err = |source| RunError::Spawn {
            program: spec.executable_path.clone(),
            source,
        };
        let program = env
            .resolve_program(&spec.executable_path)
            .ok_or_else(|| spawn_err(io::Error::from(io::ErrorKind::NotFound)))?;

        let (mut reader, writer) = io::pipe().map_err(spawn_err)?;

        // The Command owns our copies of the write end; it must be dropped
        // before reading or EOF never arrives.
        let mut child = {
            // Spawn the resolved path but hand the child its token as argv[0].
            let mut cmd = Command::new(program);
            cmd.arg0(&spec.executable_path).args(&spec.argument_list);
            env.apply(&mut cmd);
            cmd.stdin(Stdio::null())
                .stdout(writer.try_clone().map_err(spawn_err)?)
                .stderr(writer);
            cmd.spawn().map_err(spawn_err)?
        };
        run.advance(Stage::Spawned);

        let mut raw = Vec::new();
        let read = reader.read_to_end(&mut raw);
        let status = child.wait().map_err(|source| RunError::Capture { source })?;
        read.map_err(|source| RunError::Capture { source })?;

        Ok((String::from_utf8_lossy(&raw).into_owned(), Exit::from(status)))
    }
}

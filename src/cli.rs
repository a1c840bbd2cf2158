use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use crate::{
    build::{BuildTarget, Builder, DEFAULT_CFLAGS, DEFAULT_COMPILER},
    env::ExecutionEnvironment,
    run::{Runner, DEFAULT_ARGS},
    tokenize,
};

#[derive(Parser, Debug, Clone)]
#[command(name = "convh", about = "Build and run convolution kernel variants", version)]
pub struct Cli {
    /// Directory the sources, binaries and compiler invocations are relative to.
    #[arg(short = 'C', long = "dir", value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Compiler used for every target.
    #[arg(long, default_value = DEFAULT_COMPILER)]
    pub compiler: String,

    /// Flags passed before the source file, split shell-style.
    #[arg(long, default_value = DEFAULT_CFLAGS, allow_hyphen_values = true)]
    pub cflags: String,

    /// Arguments forwarded verbatim to every binary.
    #[arg(long, default_value = DEFAULT_ARGS, allow_hyphen_values = true)]
    pub args: String,

    /// Target as SOURCE=BINARY. Repeat to declare several, in run order.
    /// Defaults to the three conv-harness variants.
    #[arg(short = 't', long = "target", value_name = "SRC=BIN", action = ArgAction::Append)]
    pub targets: Vec<BuildTarget>,

    /// Run existing binaries without compiling.
    #[arg(long)]
    pub skip_build: bool,

    /// Do not run targets whose build failed; report the build error instead.
    #[arg(long, conflicts_with = "skip_build")]
    pub strict_build: bool,

    /// Print diagnostics to stderr (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn targets(&self) -> Vec<BuildTarget> {
        if self.targets.is_empty() {
            BuildTarget::defaults()
        } else {
            self.targets.clone()
        }
    }

    pub fn builder(&self) -> Result<Builder> {
        let flags = tokenize::split(&self.cflags)
            .with_context(|| format!("invalid --cflags `{}`", self.cflags))?;
        Ok(Builder::new(self.compiler.clone(), flags))
    }

    pub fn runner(&self) -> Runner {
        Runner::new(self.args.clone())
    }

    pub fn environment(&self) -> Result<ExecutionEnvironment> {
        let env = ExecutionEnvironment::current().context("cannot read current directory")?;
        Ok(match &self.dir {
            Some(dir) => {
                let dir = env.resolve_path(dir);
                env.with_working_dir(dir)
            }
            None => env,
        })
    }
}

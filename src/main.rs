use std::io::stdout;

use anyhow::{Context, Result};
use convh::{
    cli::Cli,
    report::{BUILD_DONE, RUN_START},
    LineReporter, Reporter,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let env = cli.environment()?;
    let builder = cli.builder()?;
    let runner = cli.runner();
    let targets = cli.targets();
    debug!(?env, targets = targets.len(), "starting");

    let mut reporter = LineReporter::new(stdout().lock());

    let builds = if cli.skip_build {
        None
    } else {
        let outcomes = builder.build_all(&env, &targets);
        reporter.banner(BUILD_DONE).context("cannot write to stdout")?;
        Some(outcomes)
    };

    reporter.banner(RUN_START).context("cannot write to stdout")?;
    let checked = builds.as_deref().filter(|_| cli.strict_build);
    runner
        .run_all(&env, &targets, checked, &mut reporter)
        .context("cannot write to stdout")?;

    // Build and run failures are in the report; they never change our exit code.
    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

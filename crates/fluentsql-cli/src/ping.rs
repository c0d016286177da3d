use anyhow::Context;
use colored::Colorize;
use fluentsql::{ConnectionRegistry, FluentConfig, SqlResult};

use crate::cli::PingArgs;

pub fn run(args: PingArgs) -> anyhow::Result<()> {
    let config = FluentConfig::load(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;

    let mut registry = ConnectionRegistry::new();
    registry.set_tracer(config.log.tracer()?);

    let mut failed = 0usize;
    for conn in &config.connections {
        let dsn = conn.dsn()?;
        let label = format!("{}:{}", conn.engine, dsn.host());

        let result: SqlResult<()> = registry
            .connect(conn.engine, &dsn)
            .and_then(|()| registry.query("SELECT 1").map(|_| ()));
        match result {
            Ok(()) => println!("  {} {label}", "OK".green().bold()),
            Err(e) => {
                failed += 1;
                println!("  {} {label}: {}", "FAIL".red().bold(), e.message());
            }
        }
    }

    if failed > 0 {
        anyhow::bail!(
            "{failed} of {} connection(s) failed",
            config.connections.len()
        );
    }
    Ok(())
}

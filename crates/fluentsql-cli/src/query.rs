use anyhow::Context;
use fluentsql::{ExecOutcome, FluentConfig, Session};

use crate::cli::QueryArgs;
use crate::output;

pub fn run(args: QueryArgs) -> anyhow::Result<()> {
    let config = FluentConfig::load(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;
    let mut db = Session::from_config(&config)?;

    if let Some((engine, host)) = &args.server {
        db.switch_server(*engine, host)?;
    }
    tracing::debug!(
        current = %db.registry().current().map(ToString::to_string).unwrap_or_default(),
        "running query"
    );

    match db.raw(&args.sql)? {
        ExecOutcome::Rows(rows) if args.json => output::print_json_lines(&rows)?,
        ExecOutcome::Rows(rows) => output::print_rows(&rows),
        ExecOutcome::Affected(n) => println!("{n} row(s) affected"),
    }
    Ok(())
}

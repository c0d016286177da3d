mod cli;
mod output;
mod ping;
mod query;

pub fn run(args: Vec<String>) -> anyhow::Result<()> {
    let cmd = cli::parse_args(&args)?;
    match cmd {
        cli::Command::Help(topic) => {
            cli::print_help(topic);
            Ok(())
        }
        cli::Command::Query(args) => {
            init(args.verbose);
            query::run(args)
        }
        cli::Command::Ping(args) => {
            init(args.verbose);
            ping::run(args)
        }
    }
}

/// Load `.env` and install the log subscriber (stderr, so stdout stays parseable).
fn init(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let _ = dotenvy::dotenv();

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok();
}

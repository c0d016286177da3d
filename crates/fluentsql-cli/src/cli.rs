use std::path::PathBuf;

use fluentsql::EngineType;

const DEFAULT_CONFIG: &str = "fluentsql.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Query,
    Ping,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Query(QueryArgs),
    Ping(PingArgs),
}

#[derive(Debug, Clone)]
pub struct QueryArgs {
    pub config: PathBuf,
    pub server: Option<(EngineType, String)>,
    pub json: bool,
    pub verbose: bool,
    pub sql: String,
}

#[derive(Debug, Clone)]
pub struct PingArgs {
    pub config: PathBuf,
    pub verbose: bool,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1);
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    match first.as_str() {
        "-h" | "--help" => Ok(Command::Help(HelpTopic::Root)),
        "query" => parse_query(it.map(|s| s.as_str())),
        "ping" => parse_ping(it.map(|s| s.as_str())),
        _ => anyhow::bail!("unknown command: {first}"),
    }
}

/// `ENGINE:HOST`, e.g. `postgres:db2`.
fn parse_server(value: &str) -> anyhow::Result<(EngineType, String)> {
    let Some((engine, host)) = value.split_once(':') else {
        anyhow::bail!("--server expects ENGINE:HOST, got: {value}");
    };
    let host = host.trim();
    if host.is_empty() {
        anyhow::bail!("--server expects ENGINE:HOST, got: {value}");
    }
    Ok((engine.parse()?, host.to_string()))
}

fn parse_query<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut config = PathBuf::from(DEFAULT_CONFIG);
    let mut server = None;
    let mut json = false;
    let mut verbose = false;
    let mut sql: Vec<&str> = Vec::new();

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Query)),
            "--config" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--config requires a value");
                };
                config = PathBuf::from(v);
            }
            _ if token.starts_with("--config=") => {
                config = PathBuf::from(token.trim_start_matches("--config="));
            }
            "--server" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--server requires a value");
                };
                server = Some(parse_server(v)?);
            }
            _ if token.starts_with("--server=") => {
                server = Some(parse_server(token.trim_start_matches("--server="))?);
            }
            "--json" => json = true,
            "-v" | "--verbose" => verbose = true,
            "--" => sql.extend(it.by_ref()),
            _ if token.starts_with('-') && sql.is_empty() => {
                anyhow::bail!("unknown option: {token}")
            }
            _ => sql.push(token),
        }
    }

    let sql = sql.join(" ");
    if sql.trim().is_empty() {
        anyhow::bail!("query requires SQL text (see `fluentsql query --help`)");
    }

    Ok(Command::Query(QueryArgs {
        config,
        server,
        json,
        verbose,
        sql,
    }))
}

fn parse_ping<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut config = PathBuf::from(DEFAULT_CONFIG);
    let mut verbose = false;

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Ping)),
            "--config" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--config requires a value");
                };
                config = PathBuf::from(v);
            }
            _ if token.starts_with("--config=") => {
                config = PathBuf::from(token.trim_start_matches("--config="));
            }
            "-v" | "--verbose" => verbose = true,
            other => anyhow::bail!("unexpected argument: {other}"),
        }
    }

    Ok(Command::Ping(PingArgs { config, verbose }))
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
fluentsql - run SQL against configured MySQL/PostgreSQL connections

USAGE:
  fluentsql <COMMAND> [OPTIONS]

COMMANDS:
  query         Run one SQL statement on a connection
  ping          Connect every configured connection

Run `fluentsql <command> --help` for more."
            );
        }
        HelpTopic::Query => {
            println!(
                "\
USAGE:
  fluentsql query [OPTIONS] <SQL>...

OPTIONS:
  --config <FILE>         Config file path (default: fluentsql.toml)
  --server <ENGINE:HOST>  Connection to use (default: config default)
  --json                  Print rows as JSON lines
  -v, --verbose           Log executed SQL at debug level
  -h, --help              Print help"
            );
        }
        HelpTopic::Ping => {
            println!(
                "\
USAGE:
  fluentsql ping [OPTIONS]

OPTIONS:
  --config <FILE>         Config file path (default: fluentsql.toml)
  -v, --verbose           Log connection details at debug level
  -h, --help              Print help"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("fluentsql")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn parse_query_with_options() {
        let cmd = parse_args(&args(&[
            "query",
            "--config",
            "db.toml",
            "--server=postgres:db2",
            "--json",
            "SELECT",
            "1",
        ]))
        .unwrap();
        let Command::Query(query) = cmd else {
            panic!("expected query");
        };

        assert_eq!(query.config, PathBuf::from("db.toml"));
        assert_eq!(query.server, Some((EngineType::Postgres, "db2".to_string())));
        assert!(query.json);
        assert!(!query.verbose);
        assert_eq!(query.sql, "SELECT 1");
    }

    #[test]
    fn query_requires_sql() {
        let err = parse_args(&args(&["query", "--json"])).unwrap_err();
        assert!(err.to_string().contains("requires SQL text"));
    }

    #[test]
    fn bad_server_spec() {
        assert!(parse_args(&args(&["query", "--server", "db2", "SELECT 1"])).is_err());
        assert!(parse_args(&args(&["query", "--server", "oracle:db2", "SELECT 1"])).is_err());
    }

    #[test]
    fn sql_after_double_dash_keeps_dashes() {
        let cmd = parse_args(&args(&["query", "--", "SELECT", "-1"])).unwrap();
        let Command::Query(query) = cmd else {
            panic!("expected query");
        };
        assert_eq!(query.sql, "SELECT -1");
        assert_eq!(query.config, PathBuf::from(DEFAULT_CONFIG));
    }

    #[test]
    fn parse_ping_and_help() {
        let Command::Ping(ping) = parse_args(&args(&["ping", "-v"])).unwrap() else {
            panic!("expected ping");
        };
        assert!(ping.verbose);

        assert!(matches!(
            parse_args(&args(&["ping", "--help"])).unwrap(),
            Command::Help(HelpTopic::Ping)
        ));
        assert!(matches!(
            parse_args(&args(&[])).unwrap(),
            Command::Help(HelpTopic::Root)
        ));
        assert!(parse_args(&args(&["migrate"])).is_err());
    }
}

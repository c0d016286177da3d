//! Round trips against real servers.
//!
//! Set `FLUENTSQL_PG_DSN` / `FLUENTSQL_MYSQL_DSN` (or put them in `.env`);
//! run with `cargo test -- --ignored`. A test without its variable is skipped.

use fluentsql::{EngineType, ExecOutcome, Session, SqlResult};
use std::time::{SystemTime, UNIX_EPOCH};

fn dsn_from_env(var: &str) -> Option<String> {
    let _ = dotenvy::dotenv();
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn unique_table(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX_EPOCH")
        .as_nanos();
    format!("{prefix}_{}_{}", std::process::id(), nanos)
}

fn round_trip(db: &mut Session, table: &str, create: &str) -> SqlResult<()> {
    db.raw(create)?;

    let inserted = db
        .insert(table)?
        .rows([
            [("name", "ann"), ("note", "it's here")],
            [("name", "bob"), ("note", "back\\slash")],
        ])?
        .exec()?;
    assert_eq!(inserted.count(), 2);

    let rows = db
        .select(table)?
        .fields("name, note")?
        .order_by("name", fluentsql::Order::Asc)?
        .query()?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("note"), Some("it's here"));
    assert_eq!(rows[1].get("note"), Some("back\\slash"));

    assert_eq!(db.count(table, "name = ?", "bob")?, 1);

    let updated = db
        .update(table)?
        .set("note", "changed")?
        .and_where("name = ?", "ann")?
        .exec()?;
    assert_eq!(updated, ExecOutcome::Affected(1));

    let deleted = db.delete(table)?.and_where("name = ?", "bob")?.exec()?;
    assert_eq!(deleted.count(), 1);

    let drop = format!("DROP TABLE {}", db.quote_identifier(table));
    db.raw(&drop)?;
    Ok(())
}

#[cfg(feature = "postgres")]
#[test]
#[ignore = "needs a live PostgreSQL server"]
fn postgres_round_trip() -> SqlResult<()> {
    let Some(dsn) = dsn_from_env("FLUENTSQL_PG_DSN") else {
        eprintln!("FLUENTSQL_PG_DSN is not set; skipping postgres_round_trip");
        return Ok(());
    };

    let mut db = Session::default();
    db.connect(EngineType::Postgres, dsn.as_str())?;
    let table = unique_table("fluentsql_pg");
    let create = format!(
        "CREATE TABLE \"{table}\" (id SERIAL PRIMARY KEY, name TEXT NOT NULL, note TEXT)"
    );
    round_trip(&mut db, &table, &create)
}

#[cfg(feature = "mysql")]
#[test]
#[ignore = "needs a live MySQL server"]
fn mysql_round_trip() -> SqlResult<()> {
    let Some(dsn) = dsn_from_env("FLUENTSQL_MYSQL_DSN") else {
        eprintln!("FLUENTSQL_MYSQL_DSN is not set; skipping mysql_round_trip");
        return Ok(());
    };

    let mut db = Session::default();
    db.connect(EngineType::Mysql, dsn.as_str())?;
    let table = unique_table("fluentsql_my");
    let create = format!(
        "CREATE TABLE `{table}` (id INT AUTO_INCREMENT PRIMARY KEY, name VARCHAR(64) NOT NULL, note TEXT)"
    );
    round_trip(&mut db, &table, &create)
}

//! Integration tests for the builder module.

use crate::builder::{
    Conjunction, JoinList, JoinType, Order, SqlStatement, Statement, StatementKind, TableRef,
    delete, insert, select, truncate, update,
};
use crate::dialect::{EngineType, SqlContext};
use crate::expr::Expression;
use crate::value::Value;

/// Context with a table prefix hook, the way a registry renders.
struct Prefixed;

impl SqlContext for Prefixed {
    fn engine(&self) -> EngineType {
        EngineType::Postgres
    }

    fn escape(&self, value: &str) -> String {
        EngineType::Postgres.escape(value)
    }

    fn preformat_table(&self, name: &str) -> String {
        format!("app_{name}")
    }
}

#[test]
fn test_single_row_insert_keeps_key_order() {
    let qb = insert("people").values([
        ("zeta", Value::from("z")),
        ("alpha", Value::from(1)),
        ("mid", Value::from("it's")),
    ]);
    assert_eq!(
        qb.to_sql(EngineType::Postgres).unwrap(),
        r#"INSERT INTO "people" ("zeta", "alpha", "mid") VALUES ('z', 1, 'it''s')"#
    );
}

#[test]
fn test_where_or_boundary() {
    let sql = select("t")
        .and_where("a = ?", 1)
        .or_where("b = ?", 2)
        .to_sql(EngineType::Mysql)
        .unwrap();
    assert_eq!(sql, "SELECT * FROM `t` WHERE (a = 1) OR (b = 2)");
}

#[test]
fn test_where_mixed_and_or() {
    let sql = delete("t")
        .and_where("a=?", 1)
        .and_where("b=?", 2)
        .or_where("c=?", 3)
        .to_sql(EngineType::Mysql)
        .unwrap();
    assert_eq!(sql, "DELETE FROM `t` WHERE (a=1) AND (b=2) OR (c=3)");
}

#[test]
fn test_group_inside_outer_where() {
    let sql = select("t")
        .and_where("c=?", 3)
        .begin_group()
        .and_where("a=?", 1)
        .or_where("b=?", 2)
        .end_group(Conjunction::Or)
        .to_sql(EngineType::Mysql)
        .unwrap();
    assert_eq!(sql, "SELECT * FROM `t` WHERE (c=3) OR ((a=1) OR (b=2))");
}

#[test]
fn test_group_closure_form() {
    let sql = update("t")
        .set("x", 1)
        .and_where("c = ?", 3)
        .group(Conjunction::And, |w| {
            w.and_where("a = ?", 1);
            w.or_where("b = ?", 2);
        })
        .to_sql(EngineType::Mysql)
        .unwrap();
    assert_eq!(sql, "UPDATE `t` SET `x` = 1 WHERE (c = 3) AND ((a = 1) OR (b = 2))");
}

#[test]
fn test_render_is_idempotent() {
    let qb = select("users u")
        .fields("u.id, COUNT(*) AS n")
        .left_join("orders o", "o.user_id = u.id")
        .and_where("u.name = ?", "x")
        .group_by("u.id")
        .limit(5, None);
    let first = qb.to_sql(EngineType::Mysql).unwrap();
    let second = qb.to_sql(EngineType::Mysql).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_dialect_round_trip() {
    let qb = select("shop.products p")
        .fields("p.id, p.name")
        .and_where("p.price > ?", 10)
        .order_by_desc("p.price");
    let mysql = qb.to_sql(EngineType::Mysql).unwrap();
    let postgres = qb.to_sql(EngineType::Postgres).unwrap();
    assert_eq!(
        mysql,
        "SELECT p.`id`, p.`name` FROM `shop`.`products` AS p WHERE (p.price > 10) ORDER BY p.`price` DESC"
    );
    assert_eq!(mysql.replace('`', "\""), postgres);
}

#[test]
fn test_multi_row_insert() {
    let sql = insert("t")
        .rows([
            [("a", Value::from(1)), ("b", Value::from("x"))],
            [("a", Value::from(2)), ("b", Value::from("y"))],
        ])
        .to_sql(EngineType::Mysql)
        .unwrap();
    assert!(sql.ends_with("VALUES (1, 'x'), (2, 'y')"));
}

#[test]
fn test_join_gating_by_kind() {
    for kind in [insert("t").kind(), delete("t").kind(), truncate("t").kind()] {
        let err = JoinList::check_kind(kind).unwrap_err();
        assert!(err.is_builder());
        assert!(err.to_string().contains("only allowed on SELECT and UPDATE"));
    }
    assert!(JoinList::check_kind(select("t").kind()).is_ok());
    assert!(JoinList::check_kind(update("t").kind()).is_ok());

    let sql = update("a")
        .set("x", 1)
        .join("b", "b.id = a.b_id", JoinType::Plain)
        .to_sql(EngineType::Mysql)
        .unwrap();
    assert_eq!(sql, "UPDATE `a` SET `x` = 1 JOIN `b` ON b.id = a.b_id");
}

#[test]
fn test_table_hook_applies_to_tables_only() {
    let qb = select("users u")
        .fields("u.id")
        .inner_join("orders o", "o.user_id = u.id")
        .and_where("u.id = ?", 1);
    assert_eq!(
        qb.render(&Prefixed).unwrap(),
        r#"SELECT u."id" FROM "app_users" AS u INNER JOIN "app_orders" AS o ON o.user_id = u.id WHERE (u.id = 1)"#
    );
    assert_eq!(
        delete("public.logs").render(&Prefixed).unwrap(),
        r#"DELETE FROM "public"."app_logs""#
    );
}

#[test]
fn test_subselect_as_value() {
    let inner = select("banned").fields("user_id");
    let sql = delete("sessions")
        .and_where("user_id IN ?", Value::from(inner))
        .to_sql(EngineType::Mysql)
        .unwrap();
    assert_eq!(
        sql,
        "DELETE FROM `sessions` WHERE (user_id IN (SELECT `user_id` FROM `banned`))"
    );
}

#[test]
fn test_expression_as_value_and_field() {
    let sql = update("users")
        .set("seen_at", Expression::call("now"))
        .and_where("id = ?", 3)
        .to_sql(EngineType::Postgres)
        .unwrap();
    assert_eq!(sql, r#"UPDATE "users" SET "seen_at" = NOW() WHERE (id = 3)"#);

    let sql = select("orders")
        .field_expr(Expression::count("*").as_alias("counter"))
        .to_sql(EngineType::Postgres)
        .unwrap();
    assert_eq!(sql, r#"SELECT COUNT(*) AS counter FROM "orders""#);
}

#[test]
fn test_join_against_subquery() {
    let totals = select("orders").fields("user_id, SUM(total) AS spent").group_by("user_id");
    let sql = select("users u")
        .fields("u.name, t.spent")
        .join_ref(TableRef::subquery(totals, "t"), "t.user_id = u.id", JoinType::Left)
        .order_by("t.spent", Order::Desc)
        .to_sql(EngineType::Mysql)
        .unwrap();
    assert_eq!(
        sql,
        "SELECT u.`name`, t.`spent` FROM `users` AS u LEFT JOIN \
         (SELECT `user_id`, SUM(total) AS spent FROM `orders` GROUP BY `user_id`) AS t \
         ON t.user_id = u.id ORDER BY t.`spent` DESC"
    );
}

#[test]
fn test_errors_never_render() {
    let broken = select("t").and_where("a = ? AND b = ?", vec![1]);
    assert!(broken.build_error().is_some());
    assert!(broken.to_sql(EngineType::Mysql).unwrap_err().is_builder());
    assert!(broken.to_sql(EngineType::Postgres).unwrap_err().is_builder());
}

#[test]
fn test_statement_union_dispatch() {
    let stmts: Vec<Statement> = vec![
        select("t").into(),
        insert("t").values([("a", 1)]).into(),
        update("t").set("a", 2).into(),
        truncate("t").into(),
    ];
    let kinds: Vec<StatementKind> = stmts.iter().map(SqlStatement::kind).collect();
    assert_eq!(
        kinds,
        vec![
            StatementKind::Select,
            StatementKind::Insert,
            StatementKind::Update,
            StatementKind::Truncate
        ]
    );
    let sql: Vec<String> = stmts
        .iter()
        .map(|s| s.to_sql(EngineType::Mysql).unwrap())
        .collect();
    assert_eq!(sql[1], "INSERT INTO `t` (`a`) VALUES (1)");
    assert_eq!(sql[3], "TRUNCATE `t`");
}

use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use fluentsql::Row;

pub fn rows_table(rows: &[Row]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    if let Some(first) = rows.first() {
        table.set_header(first.columns().iter().map(|name| {
            Cell::new(name)
                .add_attribute(Attribute::Bold)
                .fg(Color::Cyan)
        }));
    }

    for row in rows {
        table.add_row(row.iter().map(|(_, value)| match value {
            Some(v) => Cell::new(v),
            None => Cell::new("NULL").fg(Color::DarkGrey),
        }));
    }

    table
}

pub fn print_rows(rows: &[Row]) {
    if !rows.is_empty() {
        println!("{}", rows_table(rows));
    }
    println!("({} row(s))", rows.len());
}

/// One JSON object per row; column order is kept.
pub fn print_json_lines(rows: &[Row]) -> anyhow::Result<()> {
    for row in rows {
        println!("{}", serde_json::to_string(row)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_header_and_null_marker() {
        let rows = vec![
            Row::from_pairs([("id", Some("1")), ("email", None::<&str>)]),
            Row::from_pairs([("id", Some("2")), ("email", Some("b@example.com"))]),
        ];
        let rendered = rows_table(&rows).to_string();
        assert!(rendered.contains("email"));
        assert!(rendered.contains("NULL"));
        assert!(rendered.contains("b@example.com"));
    }

    #[test]
    fn json_keeps_column_order() {
        let row = Row::from_pairs([("z", Some("1")), ("a", None::<&str>)]);
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"z":"1","a":null}"#);
    }
}

use std::cmp;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    pub name: &'a str,
    pub align: Align,
}

const INDENT: usize = 2;
const COLUMN_GAP: usize = 2;

pub fn terminal_width() -> usize {
    let from_env = std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(120);
    cmp::max(from_env, 40)
}

pub fn key_value_rows(entries: &[(&str, String)], indent: usize) -> Vec<String> {
    let label_width = entries
        .iter()
        .map(|(label, _)| label.len())
        .max()
        .unwrap_or(0);
    let padding = " ".repeat(indent);

    entries
        .iter()
        .map(|(label, value)| format!("{padding}{label:<label_width$}  {value}"))
        .collect()
}

/// Renders an aligned table, or one key/value block per row when the
/// natural table width does not fit in `max_width`.
pub fn render_table_or_blocks(
    columns: &[Column<'_>],
    rows: &[Vec<String>],
    max_width: usize,
    block_label: &str,
) -> Vec<String> {
    if columns.is_empty() {
        return Vec::new();
    }

    let widths = natural_column_widths(columns, rows);
    let total = INDENT + widths.iter().sum::<usize>() + COLUMN_GAP * (widths.len() - 1);
    if total > max_width {
        return render_blocks(columns, rows, block_label);
    }

    let header = columns
        .iter()
        .map(|column| column.name.to_string())
        .collect::<Vec<_>>();
    let mut output = vec![format_row(columns, &header, &widths)];
    output.extend(rows.iter().map(|row| format_row(columns, row, &widths)));
    output
}

/// Fixed two-decimal rendering for quantities and monetary values.
pub fn format_decimal(value: f64) -> String {
    format!("{value:.2}")
}

fn natural_column_widths(columns: &[Column<'_>], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths = columns
        .iter()
        .map(|column| column.name.chars().count())
        .collect::<Vec<usize>>();

    for row in rows {
        for (index, value) in row.iter().enumerate() {
            if let Some(slot) = widths.get_mut(index) {
                *slot = cmp::max(*slot, value.chars().count());
            }
        }
    }

    widths
}

fn format_row(columns: &[Column<'_>], cells: &[String], widths: &[usize]) -> String {
    let pieces = columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let width = widths.get(index).copied().unwrap_or(0);
            let value = cells.get(index).map(String::as_str).unwrap_or("");
            match column.align {
                Align::Left => format!("{value:<width$}"),
                Align::Right => format!("{value:>width$}"),
            }
        })
        .collect::<Vec<_>>();

    format!("{}{}", " ".repeat(INDENT), pieces.join("  "))
        .trim_end()
        .to_string()
}

fn render_blocks(columns: &[Column<'_>], rows: &[Vec<String>], block_label: &str) -> Vec<String> {
    let mut output = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        if index > 0 {
            output.push(String::new());
        }
        output.push(format!("  {block_label} {}", index + 1));
        let entries = columns
            .iter()
            .enumerate()
            .map(|(column_index, column)| {
                (
                    column.name,
                    row.get(column_index).cloned().unwrap_or_default(),
                )
            })
            .collect::<Vec<_>>();
        output.extend(key_value_rows(&entries, 4));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::{Align, Column, format_decimal, key_value_rows, render_table_or_blocks};

    const COLUMNS: [Column<'static>; 3] = [
        Column {
            name: "Type",
            align: Align::Left,
        },
        Column {
            name: "Quantile",
            align: Align::Right,
        },
        Column {
            name: "Quantity",
            align: Align::Right,
        },
    ];

    fn quantile_rows() -> Vec<Vec<String>> {
        vec![
            vec!["Te/TE, EGENPRODUKTION".into(), "0.25".into(), "17.50".into()],
            vec!["Urtete".into(), "0.75".into(), "5.00".into()],
        ]
    }

    #[test]
    fn table_aligns_columns() {
        let lines = render_table_or_blocks(&COLUMNS, &quantile_rows(), 120, "Row");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "  Type                   Quantile  Quantity");
        assert_eq!(lines[1], "  Te/TE, EGENPRODUKTION      0.25     17.50");
        assert_eq!(lines[2], "  Urtete                     0.75      5.00");
    }

    #[test]
    fn narrow_terminal_falls_back_to_blocks() {
        let lines = render_table_or_blocks(&COLUMNS, &quantile_rows(), 30, "Row");
        assert_eq!(lines[0], "  Row 1");
        assert_eq!(lines[1], "    Type      Te/TE, EGENPRODUKTION");
        assert!(lines.contains(&String::new()));
        assert!(lines.contains(&"  Row 2".to_string()));
    }

    #[test]
    fn key_value_rows_pad_labels() {
        let rows = key_value_rows(&[("Source", "file:a.csv".into()), ("Dry run", "yes".into())], 2);
        assert_eq!(rows, vec!["  Source   file:a.csv", "  Dry run  yes"]);
    }

    #[test]
    fn decimals_use_two_places() {
        assert_eq!(format_decimal(197.5), "197.50");
        assert_eq!(format_decimal(-3.0), "-3.00");
    }
}

//! Output formatting helpers for human-readable and JSON output.

use serde::Serialize;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Human }
    }
}

/// One row of `users list`
#[derive(Debug, Clone, Serialize)]
pub struct UserRow {
    pub username: String,
    pub email: String,
    pub confirmed: bool,
    pub admin: bool,
    pub logged_in: bool,
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}

/// Print users as an aligned table or a JSON array.
pub fn print_users(rows: &[UserRow], format: OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(rows)?),
        OutputFormat::Human if rows.is_empty() => println!("No users found."),
        OutputFormat::Human => {
            let cells: Vec<Vec<String>> = rows
                .iter()
                .map(|row| {
                    vec![
                        row.username.clone(),
                        row.email.clone(),
                        yes_no(row.confirmed),
                        yes_no(row.admin),
                        yes_no(row.logged_in),
                    ]
                })
                .collect();
            print_table(&["USERNAME", "EMAIL", "CONFIRMED", "ADMIN", "LOGGED IN"], &cells);
        }
    }
    Ok(())
}

/// Render a table with aligned columns.
///
/// `headers` and each row in `rows` must have the same length.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let col_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut lines = vec![render_row(headers.iter().copied(), &widths)];
    for row in rows {
        lines.push(render_row(
            row.iter().take(col_count).map(String::as_str),
            &widths,
        ));
    }
    lines.join("\n")
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths.iter().copied())
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    println!("{}", format_table(headers, rows));
}

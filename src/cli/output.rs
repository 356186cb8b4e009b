//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow bold "Warning:" prefix)
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "Warning:".yellow().bold(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print bold text, used for hints and headings
pub fn bold(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().bold());
}

/// Print yellow text without prefix
pub fn caution(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().yellow());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Cell styling for table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Plain,
    Dim,
    Bold,
}

/// Table column: header text and cell style.
#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    pub header: &'a str,
    pub style: CellStyle,
}

impl<'a> Column<'a> {
    pub fn new(header: &'a str, style: CellStyle) -> Self {
        Self { header, style }
    }
}

fn styled(text: &str, style: CellStyle) -> String {
    match style {
        CellStyle::Plain => text.to_string(),
        CellStyle::Dim => text.dimmed().to_string(),
        CellStyle::Bold => text.bold().to_string(),
    }
}

/// Render a titled table. Widths are measured in chars before styling is applied.
pub fn render_table(title: &str, columns: &[Column<'_>], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.header.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let pad = |text: &str, width: usize| {
        let fill = width.saturating_sub(text.chars().count());
        format!("{}{}", text, " ".repeat(fill))
    };
    let join = |cells: Vec<String>| cells.join("  ").trim_end().to_string();

    let mut lines = vec![title.bold().to_string()];
    lines.push(join(
        columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| pad(c.header, *w).cyan().bold().to_string())
            .collect(),
    ));
    lines.push(join(widths.iter().map(|w| "─".repeat(*w)).collect()));
    for row in rows {
        lines.push(join(
            columns
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(i, (c, w))| {
                    let cell = row.get(i).map(String::as_str).unwrap_or("");
                    styled(&pad(cell, *w), c.style)
                })
                .collect(),
        ));
    }
    lines.join("\n")
}

/// Print a titled table
pub fn table(title: &str, columns: &[Column<'_>], rows: &[Vec<String>]) {
    println!("{}", render_table(title, columns, rows));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_rows_when_rendering_table_then_aligns_columns() {
        colored::control::set_override(false);
        let columns = [
            Column::new("Field", CellStyle::Bold),
            Column::new("Value", CellStyle::Plain),
        ];
        let rows = vec![
            vec!["Email".to_string(), "jane@example.com".to_string()],
            vec!["Phone".to_string(), "••••••1234".to_string()],
        ];

        let rendered = render_table("User Credentials", &columns, &rows);

        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "User Credentials");
        assert_eq!(lines[1], "Field  Value");
        assert_eq!(lines[2], "─────  ────────────────");
        assert_eq!(lines[3], "Email  jane@example.com");
        assert_eq!(lines[4], "Phone  ••••••1234");
    }

    #[test]
    fn given_short_row_when_rendering_table_then_fills_missing_cells() {
        colored::control::set_override(false);
        let columns = [
            Column::new("ID", CellStyle::Dim),
            Column::new("Name", CellStyle::Plain),
        ];

        let rendered = render_table("T", &columns, &[vec!["only-id".to_string()]]);

        assert_eq!(rendered.lines().last().unwrap(), "only-id");
    }
}

//! Table formatting utilities

use prettytable::format::Alignment;
use prettytable::{Cell, Row, Table};

/// Build a table with a left-aligned label column followed by numeric columns
pub fn numeric_table<I>(headers: &[&str], rows: I) -> Table
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut table = Table::new();
    table.set_format(*prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(Row::new(
        headers.iter().map(|h| Cell::new(h).style_spec("b")).collect(),
    ));

    for row in rows {
        let cells = row
            .iter()
            .enumerate()
            .map(|(column, text)| {
                let alignment = if column == 0 {
                    Alignment::LEFT
                } else {
                    Alignment::RIGHT
                };
                Cell::new_align(text, alignment)
            })
            .collect();
        table.add_row(Row::new(cells));
    }

    table
}

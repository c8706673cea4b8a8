/// GFM table rows: cell splitting and the delimiter row
use crate::ast::Alignment;

/// Split a table row into trimmed cell texts.
///
/// Cells are separated by unescaped pipes; a leading and a trailing pipe
/// are optional. `\|` becomes a literal pipe in the cell text, which also
/// holds inside code spans.
pub fn split_row(line: &str) -> Vec<String> {
    let line = line.trim_matches(|c| c == ' ' || c == '\t');
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut ends_with_pipe = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        ends_with_pipe = false;
        match c {
            '\\' => match chars.next() {
                Some('|') => current.push('|'),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            '|' => {
                cells.push(std::mem::take(&mut current));
                ends_with_pipe = true;
            }
            _ => current.push(c),
        }
    }
    if !ends_with_pipe {
        cells.push(current);
    }
    if line.starts_with('|') && !cells.is_empty() {
        cells.remove(0);
    }

    cells.into_iter().map(|cell| cell.trim().to_string()).collect()
}

/// Parse a delimiter row such as `| :--- | ---: | :-: |` into column
/// alignments. Returns `None` if any cell is not a run of dashes with
/// optional colons.
pub fn parse_delimiter_row(line: &str) -> Option<Vec<Alignment>> {
    let cells = split_row(line);
    if cells.is_empty() {
        return None;
    }

    cells
        .iter()
        .map(|cell| {
            let left = cell.starts_with(':');
            let right = cell.len() > 1 && cell.ends_with(':');
            let dashes = &cell[usize::from(left)..cell.len() - usize::from(right)];
            if dashes.is_empty() || !dashes.bytes().all(|b| b == b'-') {
                return None;
            }
            Some(match (left, right) {
                (true, true) => Alignment::Center,
                (true, false) => Alignment::Left,
                (false, true) => Alignment::Right,
                (false, false) => Alignment::None,
            })
        })
        .collect()
}

/// Fit a body row to the header's column count: missing cells are empty,
/// extra cells are dropped.
pub fn fit_row(mut cells: Vec<String>, columns: usize) -> Vec<String> {
    cells.resize(columns, String::new());
    cells
}

//! Markdown table extraction
//!
//! Explicit line-classification scan with three states: seeking a header
//! line, seeking the separator row that must follow it, and collecting data
//! rows. Candidates without a separator, without header cells, or without
//! surviving data rows are discarded rather than surfaced as errors.

/// A table recognized in reply text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Byte offsets of the table in the source text, header line through
    /// the end of the last data row.
    pub span: (usize, usize),
}

impl ExtractedTable {
    /// A table whose every column is blank across all rows carries no
    /// information and is suppressed at emission time.
    pub fn is_all_blank(&self) -> bool {
        self.rows
            .iter()
            .all(|row| row.iter().all(|cell| is_blank_cell(cell)))
    }
}

/// Blank or placeholder cell values, as emitted by dataframe-backed agents.
pub fn is_blank_cell(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("none")
}

/// A line of separator punctuation: bars, dashes, colons and whitespace
/// only, with at least one dash.
pub fn is_separator_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && trimmed.contains('-')
        && trimmed
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':' | ' ' | '\t'))
}

/// Extract every well-formed table from `text` and return them alongside
/// the remainder with the recognized spans removed.
pub fn extract_tables(text: &str) -> (Vec<ExtractedTable>, String) {
    let tables = scan_tables(text);

    let mut remainder = text.to_string();
    // Work from the last span to the first so earlier offsets stay valid.
    for table in tables.iter().rev() {
        let (start, mut end) = table.span;
        // Swallow the line terminator of the last table row.
        if remainder.as_bytes().get(end) == Some(&b'\n') {
            end += 1;
        }
        remainder.replace_range(start..end, "");
    }

    (tables, remainder)
}

enum ScanState<'a> {
    SeekingHeader,
    /// A line with at least one bar was seen; waiting for its separator.
    SeekingSeparator { header: Line<'a> },
    CollectingRows { candidate: Candidate },
}

struct Candidate {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    start: usize,
    end: usize,
}

impl Candidate {
    fn finish(self, tables: &mut Vec<ExtractedTable>) {
        // Zero surviving data rows: not a table.
        if !self.rows.is_empty() {
            tables.push(ExtractedTable {
                header: self.header,
                rows: self.rows,
                span: (self.start, self.end),
            });
        }
    }
}

#[derive(Clone, Copy)]
struct Line<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

fn scan_tables(text: &str) -> Vec<ExtractedTable> {
    let mut tables = Vec::new();
    let mut state = ScanState::SeekingHeader;

    let mut offset = 0;
    for raw in text.split_inclusive('\n') {
        let content = raw.trim_end_matches('\n').trim_end_matches('\r');
        let line = Line {
            text: content,
            start: offset,
            end: offset + content.len(),
        };
        offset += raw.len();

        let has_bar = line.text.contains('|');
        let is_separator = is_separator_line(line.text);

        state = match state {
            ScanState::SeekingHeader => {
                if has_bar && !is_separator {
                    ScanState::SeekingSeparator { header: line }
                } else {
                    ScanState::SeekingHeader
                }
            }
            ScanState::SeekingSeparator { header } => {
                if is_separator {
                    let cells = parse_header(header.text);
                    if cells.is_empty() {
                        ScanState::SeekingHeader
                    } else {
                        ScanState::CollectingRows {
                            candidate: Candidate {
                                header: cells,
                                rows: Vec::new(),
                                start: header.start,
                                end: line.end,
                            },
                        }
                    }
                } else if has_bar {
                    // The header is the line immediately preceding the
                    // separator, so a newer bar line supersedes the old one.
                    ScanState::SeekingSeparator { header: line }
                } else {
                    ScanState::SeekingHeader
                }
            }
            ScanState::CollectingRows { mut candidate } => {
                if is_separator {
                    // Stray separator rows inside the block are skipped.
                    candidate.end = line.end;
                    ScanState::CollectingRows { candidate }
                } else if has_bar {
                    if let Some(row) = parse_row(line.text, candidate.header.len()) {
                        candidate.rows.push(row);
                    }
                    candidate.end = line.end;
                    ScanState::CollectingRows { candidate }
                } else {
                    candidate.finish(&mut tables);
                    ScanState::SeekingHeader
                }
            }
        };
    }

    if let ScanState::CollectingRows { candidate } = state {
        candidate.finish(&mut tables);
    }

    tables
}

/// Split a header line on bars. Leading/trailing empties come from the bar
/// syntax; only the non-empty trimmed cells form the header.
fn parse_header(line: &str) -> Vec<String> {
    line.split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Split a data row on bars and reconcile it to the header width.
///
/// Returns None when the row is all-empty after reconciliation.
fn parse_row(line: &str, width: usize) -> Option<Vec<String>> {
    let mut cells: Vec<&str> = line.split('|').map(str::trim).collect();

    // Drop the empties produced by a leading/trailing bar, but keep interior
    // empties: those are legitimate missing values.
    if cells.first() == Some(&"") {
        cells.remove(0);
    }
    if cells.last() == Some(&"") {
        cells.pop();
    }

    // An over-wide row whose first cell is purely numeric carries a spurious
    // row-index column.
    if cells.len() > width && is_numeric(cells.first().copied().unwrap_or_default()) {
        cells.remove(0);
    }

    cells.truncate(width);
    let mut row: Vec<String> = cells.into_iter().map(ToString::to_string).collect();
    row.resize(width, String::new());

    if row.iter().all(|cell| cell.is_empty()) {
        None
    } else {
        Some(row)
    }
}

fn is_numeric(cell: &str) -> bool {
    !cell.is_empty() && cell.chars().all(|c| c.is_ascii_digit())
}

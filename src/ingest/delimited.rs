//! Line- and CSV-based record extraction.

use super::InputError;

const HEADER: &str = "text";
const DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// One record per non-blank line; a leading `text` header line is skipped.
pub fn parse_lines(text: &str) -> Vec<String> {
    lines_with(text, |l| l.to_string())
}

/// CSV with a sniffed delimiter. A multi-column header must contain a
/// `text` column; a single-column file is read line by line.
pub fn parse_csv(text: &str) -> Result<Vec<String>, InputError> {
    let first = text.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();
    let Some(delimiter) = sniff_delimiter(first) else {
        return Ok(lines_with(text, unquote));
    };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = rdr.headers()?.clone();
    let idx = headers
        .iter()
        .position(is_header)
        .ok_or_else(|| InputError::MissingTextColumn {
            found: headers.iter().collect::<Vec<_>>().join(", "),
        })?;

    let mut out = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if let Some(cell) = record.get(idx) {
            if !cell.trim().is_empty() {
                out.push(cell.to_string());
            }
        }
    }
    Ok(out)
}

fn lines_with<F>(text: &str, f: F) -> Vec<String>
where
    F: Fn(&str) -> String,
{
    let mut lines = text.lines().filter(|l| !l.trim().is_empty()).peekable();
    if lines.peek().is_some_and(|l| is_header(&unquote(l))) {
        lines.next();
    }
    lines
        .map(f)
        .filter(|l| !l.trim().is_empty())
        .collect()
}

fn is_header(cell: &str) -> bool {
    cell.trim().eq_ignore_ascii_case(HEADER)
}

/// Most frequent delimiter outside quotes in the header line, if any.
fn sniff_delimiter(line: &str) -> Option<u8> {
    let mut counts = [0usize; DELIMITERS.len()];
    let mut in_quotes = false;
    for b in line.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(i) = DELIMITERS.iter().position(|d| *d == b) {
            counts[i] += 1;
        }
    }
    let (best, n) = counts
        .iter()
        .enumerate()
        .fold((0, 0), |acc, (i, &n)| if n > acc.1 { (i, n) } else { acc });
    (n > 0).then_some(DELIMITERS[best])
}

/// Strip one level of CSV quoting from a whole-line cell.
fn unquote(line: &str) -> String {
    let t = line.trim();
    if t.len() >= 2 && t.starts_with('"') && t.ends_with('"') {
        t[1..t.len() - 1].replace("\"\"", "\"")
    } else {
        line.to_string()
    }
}

//! Minimal RFC-4180 CSV codec.
//!
//! Reading accepts `\n` or `\r\n`, quoted fields with doubled quotes and
//! embedded newlines, a leading UTF-8 BOM, and skips blank lines. Writing
//! quotes only fields that need it and always ends records with `\n`, so the
//! same rows always render to the same bytes.

/// One parsed record with the 1-based line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    pub line: usize,
    pub cells: Vec<String>,
}

impl CsvRecord {
    /// Cell at `idx`; short records read missing trailing cells as empty.
    pub fn cell(&self, idx: usize) -> &str {
        self.cells.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// Header (trimmed) plus data records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDocument {
    pub header: Vec<String>,
    pub records: Vec<CsvRecord>,
}

impl CsvDocument {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Required columns absent from the header, in the order asked.
    pub fn missing_columns<'a>(&self, required: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
        required
            .into_iter()
            .filter(|name| self.column(name).is_none())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CsvError {
    #[error("missing header row")]
    MissingHeader,

    #[error("line {0}: unterminated quoted field")]
    UnterminatedQuote(usize),

    #[error("line {0}: unexpected character after closing quote")]
    StrayQuote(usize),
}

pub fn parse_csv(text: &str) -> Result<CsvDocument, CsvError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut records = Vec::new();
    let mut cells: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut after_quote = false;
    let mut quoted_seen = false;
    let mut line = 1;
    let mut record_line = 1;

    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => {
                    in_quotes = false;
                    after_quote = true;
                }
                '\n' => {
                    line += 1;
                    field.push('\n');
                }
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            ',' => {
                cells.push(std::mem::take(&mut field));
                after_quote = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                finish_record(&mut records, &mut cells, &mut field, quoted_seen, record_line);
                quoted_seen = false;
                after_quote = false;
                line += 1;
                record_line = line;
            }
            '"' if field.is_empty() && !after_quote => {
                in_quotes = true;
                quoted_seen = true;
            }
            _ if after_quote => return Err(CsvError::StrayQuote(line)),
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err(CsvError::UnterminatedQuote(record_line));
    }
    if !field.is_empty() || !cells.is_empty() || quoted_seen {
        finish_record(&mut records, &mut cells, &mut field, quoted_seen, record_line);
    }

    let mut records = records.into_iter();
    let header = records.next().ok_or(CsvError::MissingHeader)?;
    let header: Vec<String> = header.cells.iter().map(|h| h.trim().to_string()).collect();
    if header.iter().all(String::is_empty) {
        return Err(CsvError::MissingHeader);
    }

    Ok(CsvDocument {
        header,
        records: records.collect(),
    })
}

fn finish_record(
    records: &mut Vec<CsvRecord>,
    cells: &mut Vec<String>,
    field: &mut String,
    quoted_seen: bool,
    line: usize,
) {
    cells.push(std::mem::take(field));
    let blank = !quoted_seen && cells.len() == 1 && cells[0].trim().is_empty();
    let cells = std::mem::take(cells);
    if !blank {
        records.push(CsvRecord { line, cells });
    }
}

/// Append one record, quoting only where required.
pub fn render_record<S: AsRef<str>>(out: &mut String, cells: &[S]) {
    for (idx, cell) in cells.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        let cell = cell.as_ref();
        if cell.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}

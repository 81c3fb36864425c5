//! Minimal comma-separated row codec.
//!
//! Used for the decision file and the CSV exporter. Follows RFC 4180
//! quoting: a field containing a comma, a double quote or a line break is
//! wrapped in double quotes and inner quotes are doubled. Quoted fields may
//! span lines.

use std::fmt;
use std::io::{self, Write};

/// One parsed row and the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub line: usize,
    pub fields: Vec<String>,
}

/// The input ended inside a quoted field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnterminatedQuote {
    pub line: usize,
}

impl fmt::Display for UnterminatedQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unterminated quoted field starting on line {}", self.line)
    }
}

impl std::error::Error for UnterminatedQuote {}

fn needs_quoting(field: &str) -> bool {
    field.contains([',', '"', '\n', '\r'])
}

/// Write one row terminated by `\n`.
///
/// # Errors
///
/// Propagates write failures from `w`.
pub fn write_row<W: Write + ?Sized, S: AsRef<str>>(w: &mut W, fields: &[S]) -> io::Result<()> {
    for (idx, field) in fields.iter().enumerate() {
        if idx > 0 {
            w.write_all(b",")?;
        }
        let field = field.as_ref();
        if needs_quoting(field) {
            write!(w, "\"{}\"", field.replace('"', "\"\""))?;
        } else {
            w.write_all(field.as_bytes())?;
        }
    }
    w.write_all(b"\n")
}

/// Parse all rows in `content`. Blank lines are skipped.
///
/// # Errors
///
/// Returns [`UnterminatedQuote`] when a quoted field is never closed.
pub fn parse_rows(content: &str) -> Result<Vec<Row>, UnterminatedQuote> {
    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_line = 1;
    let mut row_has_content = false;

    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                row_has_content = true;
            }
            ',' => {
                fields.push(std::mem::take(&mut field));
                row_has_content = true;
            }
            '\r' => {}
            '\n' => {
                if row_has_content {
                    fields.push(std::mem::take(&mut field));
                    rows.push(Row {
                        line: row_line,
                        fields: std::mem::take(&mut fields),
                    });
                }
                row_has_content = false;
                line += 1;
                row_line = line;
            }
            _ => {
                field.push(c);
                row_has_content = true;
            }
        }
    }

    if in_quotes {
        return Err(UnterminatedQuote { line: row_line });
    }

    if row_has_content {
        fields.push(field);
        rows.push(Row {
            line: row_line,
            fields,
        });
    }

    Ok(rows)
}

//! Tab-separated triple source for the kiji pipeline.
//!
//! Extraction collaborators hand over corpora as UTF-8 text, one fact per
//! line: `verb <TAB> source|source <TAB> target|target <TAB> chunk-id`.
//! Blank lines and `#` comments are skipped. Labels are case-sensitive and
//! passed through untouched; deduplication is the core's responsibility.

use std::io::BufRead;

use thiserror::Error;

use kiji_core::Triple;

/// Errors raised while parsing a triple corpus.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TripleParseError {
    /// A line did not have the four tab-separated fields.
    #[error("line {line}: expected 4 tab-separated fields, found {found}")]
    FieldCount {
        /// One-based line number.
        line: usize,
        /// Number of fields observed.
        found: usize,
    },
    /// A line's chunk-id field was not an unsigned integer.
    #[error("line {line}: chunk id `{raw}` is not an unsigned integer")]
    BadChunkId {
        /// One-based line number.
        line: usize,
        /// Raw field content.
        raw: String,
    },
    /// A line carried an empty verb.
    #[error("line {line}: verb is empty")]
    EmptyVerb {
        /// One-based line number.
        line: usize,
    },
    /// Reading the underlying stream failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

fn split_labels(field: &str) -> Vec<String> {
    field
        .split('|')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_owned)
        .collect()
}

fn parse_line(line_number: usize, line: &str) -> Result<Option<Triple>, TripleParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 4 {
        return Err(TripleParseError::FieldCount {
            line: line_number,
            found: fields.len(),
        });
    }

    let verb = fields[0].trim();
    if verb.is_empty() {
        return Err(TripleParseError::EmptyVerb { line: line_number });
    }
    let chunk_id = fields[3]
        .trim()
        .parse::<u64>()
        .map_err(|_| TripleParseError::BadChunkId {
            line: line_number,
            raw: fields[3].trim().to_owned(),
        })?;

    Ok(Some(Triple::new(
        verb,
        split_labels(fields[1]),
        split_labels(fields[2]),
        chunk_id,
    )))
}

/// Parses a whole corpus from a buffered reader.
///
/// # Errors
/// Returns the first [`TripleParseError`] encountered; partial corpora are
/// not returned.
pub fn parse_triples(reader: impl BufRead) -> Result<Vec<Triple>, TripleParseError> {
    let mut triples = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some(triple) = parse_line(index + 1, &line)? {
            triples.push(triple);
        }
    }
    Ok(triples)
}

/// Parses a corpus held in memory.
///
/// # Errors
/// See [`parse_triples`].
///
/// # Examples
/// ```
/// use kiji_providers_triples::parse_triples_str;
///
/// let triples = parse_triples_str("acquired\tApple\tBeats\t42\n").expect("line is well-formed");
/// assert_eq!(triples.len(), 1);
/// assert_eq!(triples[0].verb, "acquired");
/// ```
pub fn parse_triples_str(corpus: &str) -> Result<Vec<Triple>, TripleParseError> {
    parse_triples(corpus.as_bytes())
}

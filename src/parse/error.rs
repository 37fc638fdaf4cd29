use crate::prelude::*;

use crate::header::ValidationError;

use super::line_summary::LineSummary;

use std::fmt;

/// Failure while reading a file, with the place it happened.
#[derive(Debug, thiserror::Error)]
#[error("{location}: {kind}")]
pub struct ParseError {
    location: Location,
    kind: ParseErrorKind,
}

impl ParseError {
    pub fn new<K: Into<ParseErrorKind>>(location: Location, kind: K) -> Self {
        Self {
            location,
            kind: kind.into(),
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    /// position of this failure in the crate wide taxonomy
    pub fn error_kind(&self) -> ErrorKind {
        match &self.kind {
            ParseErrorKind::Structural(_) => ErrorKind::Structural,
            ParseErrorKind::Encoding(_) => ErrorKind::Encoding,
            ParseErrorKind::Invalid(err) => err.kind(),
        }
    }
}

/// Name of the input and the 1-based line, when it is still known.
///
/// Line numbers are lost once a binary block has been read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub source: String,
    pub line: Option<usize>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.source, line),
            None => write!(f, "{}", self.source),
        }
    }
}

#[derive(Debug, thiserror::Error, From)]
pub enum ParseErrorKind {
    #[error("malformed file structure: {0}")]
    Structural(Structural),
    #[error("bad data: {0}")]
    Encoding(Encoding),
    #[error("invalid header: {0}")]
    Invalid(ValidationError),
}

#[derive(Debug, thiserror::Error, From)]
pub enum Structural {
    #[error("{0}")]
    UnexpectedLine(UnexpectedLine),
    #[error("{0}")]
    PrematureEof(PrematureEof),
    #[error("{0}")]
    FieldInDataBlock(FieldInDataBlock),
    #[error("{0}")]
    DataBlockTooLong(DataBlockTooLong),
    #[error("{0}")]
    UnsupportedSegmentCount(UnsupportedSegmentCount),
    #[error("{0}")]
    BadFileHeader(BadFileHeader),
}

#[derive(Debug, thiserror::Error, From)]
pub enum Encoding {
    #[error("{0}")]
    NonNumeric(NonNumeric),
    #[error("{0}")]
    NonFinite(NonFinite),
    #[error("{0}")]
    BadCheckValue(BadCheckValue),
    #[error("{0}")]
    ShortRead(ShortRead),
    #[error("{0}")]
    BinaryInTrailer(BinaryInTrailer),
    #[error("{0}")]
    IncompleteRecord(IncompleteRecord),
}

#[derive(Display, Debug)]
#[display(fmt = "expected {expected}, found {actual}")]
pub struct UnexpectedLine {
    expected: String,
    actual: LineSummary,
}

impl UnexpectedLine {
    pub(crate) fn new<T: Into<String>>(expected: T, actual: LineSummary) -> Self {
        Self {
            expected: expected.into(),
            actual,
        }
    }
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "premature end of file while reading {context}")]
pub struct PrematureEof {
    context: &'static str,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "field-value pair inside data block: {line}")]
pub struct FieldInDataBlock {
    line: LineSummary,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "data block too long, or end data marker missing: {line}")]
pub struct DataBlockTooLong {
    line: LineSummary,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "only files with one segment are supported, found `{count}`")]
pub struct UnsupportedSegmentCount {
    count: String,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "bad file header: {reason}")]
pub struct BadFileHeader {
    reason: &'static str,
}

#[derive(Display, Debug)]
#[display(fmt = "`{token}` is not a number")]
pub struct NonNumeric {
    token: String,
}

impl NonNumeric {
    pub(crate) fn new<T: Into<String>>(token: T) -> Self {
        Self { token: token.into() }
    }
}

#[derive(Display, Debug)]
#[display(fmt = "`{token}` is not a finite number")]
pub struct NonFinite {
    token: String,
}

impl NonFinite {
    pub(crate) fn new<T: Into<String>>(token: T) -> Self {
        Self { token: token.into() }
    }
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "check value mismatch in `{style}` block (possibly wrong byte order)")]
pub struct BadCheckValue {
    style: &'static str,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "data block ended after {read} of {expected} records")]
pub struct ShortRead {
    read: usize,
    expected: usize,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "binary byte 0x{byte:02x} after the data block")]
pub struct BinaryInTrailer {
    byte: u8,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "data line holds {found} numbers, at least {expected} are needed")]
pub struct IncompleteRecord {
    found: usize,
    expected: usize,
}

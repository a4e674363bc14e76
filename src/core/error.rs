//! Purpose: Single error type shared by every kernel and the CLI.
//! Exports: `Error`, `ErrorKind`, `to_exit_code`.
//! Role: Errors are the only failure channel; kernels never log failures.
//! Invariants: Kinds are stable; exit codes never get renumbered.
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    MalformedFrame,
    LengthMismatch,
    RecordTooLarge,
    Payload,
    Encode,
    UnsupportedPrecision,
    IndexOutOfRange,
    Io,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    index: Option<usize>,
    offset: Option<u64>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            index: None,
            offset: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(index) = self.index {
            write!(f, " (index: {index})")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " (offset: {offset})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::MalformedFrame => 3,
        ErrorKind::LengthMismatch => 4,
        ErrorKind::RecordTooLarge => 5,
        ErrorKind::Payload => 6,
        ErrorKind::Encode => 7,
        ErrorKind::UnsupportedPrecision => 8,
        ErrorKind::IndexOutOfRange => 9,
        ErrorKind::Io => 10,
    }
}

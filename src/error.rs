use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
#[error("Expected {expected} {location} but observed: {observed}")]
pub struct ParseError {
    expected: &'static str,
    observed: String,
    location: Location,
}

#[derive(Debug)]
pub enum Location {
    Unknown,
    File { path: PathBuf, line: usize },
    Item { type_: &'static str, index: usize },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Unknown => write!(f, "at unknown location"),
            Location::File { path, line } => {
                write!(f, "in file {} on line {}", path.as_path().display(), line)
            }
            Location::Item { type_, index } => {
                write!(f, "for item of type {} at index {}", type_, index)
            }
        }
    }
}

impl ParseError {
    pub fn somewhere(expected: &'static str, observed: String) -> Self {
        Self {
            expected,
            observed,
            location: Location::Unknown,
        }
    }

    pub fn file(path: PathBuf, line: usize, expected: &'static str, observed: String) -> Self {
        let location = Location::File { path, line };
        Self {
            observed,
            expected,
            location,
        }
    }

    pub fn item(
        type_: &'static str,
        index: usize,
        expected: &'static str,
        observed: String,
    ) -> Self {
        let location = Location::Item { type_, index };
        Self {
            observed,
            expected,
            location,
        }
    }

    /// Attach a file location to an error that was produced without one.
    ///
    /// Item locations are more specific and are kept as they are.
    pub fn in_file(self, path: PathBuf, line: usize) -> Self {
        let location = match self.location {
            Location::Unknown => Location::File { path, line },
            other => other,
        };
        Self { location, ..self }
    }
}

/// A mutation kind letter that is neither `I` nor `D`
#[derive(Debug, Error)]
#[error("Invalid mutation kind: expected I or D but observed: {observed}")]
pub struct InvalidKindError {
    observed: char,
}

impl InvalidKindError {
    pub fn new(observed: char) -> Self {
        Self { observed }
    }

    pub fn observed(&self) -> char {
        self.observed
    }
}

impl From<InvalidKindError> for ParseError {
    fn from(e: InvalidKindError) -> Self {
        ParseError::somewhere("mutation kind I or D", e.observed.to_string())
    }
}

#[derive(Debug, Error)]
pub struct FileError {
    path: Option<PathBuf>,
    #[source]
    source: FileErrorSource,
}

impl FileError {
    pub fn io<P: AsRef<Path>>(path: Option<P>, error: std::io::Error) -> Self {
        let path = match path {
            Some(p) => Some(p.as_ref().to_path_buf()),
            None => None,
        };
        Self {
            path,
            source: error.into(),
        }
    }

    pub fn parse<P: AsRef<Path>>(path: Option<P>, error: ParseError) -> Self {
        let path = match path {
            Some(p) => Some(p.as_ref().to_path_buf()),
            None => None,
        };
        Self {
            path,
            source: error.into(),
        }
    }
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "Failed to work with file {}", path.display()),
            None => write!(f, "Failed to work with anonymous file"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FileErrorSource {
    #[error("Failed to parse file")]
    Parse {
        #[from]
        source: ParseError,
    },
    #[error("Failed to read/write to file")]
    IO {
        #[from]
        source: std::io::Error,
    },
}

/// A barcode without any indel observations
///
/// The insertion/deletion ratio of such a barcode is a division by zero.
#[derive(Debug, Error)]
#[error("Barcode {barcode} has no indel observations and no defined insertion/deletion ratio")]
pub struct EmptyBarcodeError {
    barcode: String,
}

impl EmptyBarcodeError {
    pub fn new(barcode: String) -> Self {
        Self { barcode }
    }

    pub fn barcode(&self) -> &str {
        &self.barcode
    }
}

/// A barcode that is not present in the report
#[derive(Debug, Error)]
#[error("Barcode {barcode} is not present in the report")]
pub struct BarcodeNotFoundError {
    barcode: String,
}

impl BarcodeNotFoundError {
    pub fn new(barcode: String) -> Self {
        Self { barcode }
    }
}

/// Catch-all error for top-level API
#[derive(Debug, Error)]
pub enum IndelstatError {
    #[error(transparent)]
    ParseError(#[from] ParseError),
    #[error(transparent)]
    FileError(#[from] FileError),
    #[error(transparent)]
    EmptyBarcodeError(#[from] EmptyBarcodeError),
    #[error(transparent)]
    BarcodeNotFoundError(#[from] BarcodeNotFoundError),
    #[error("Analysis was cancelled")]
    Cancelled,
}

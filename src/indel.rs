use std::convert::TryFrom;
use std::fmt;

use crate::error::{InvalidKindError, ParseError};

/// The two kinds of indel mutations
///
/// There is deliberately no third value. Any other kind letter in the input
/// is a hard parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndelKind {
    Insertion,
    Deletion,
}

impl IndelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insertion => "insertion",
            Self::Deletion => "deletion",
        }
    }
}

impl From<IndelKind> for char {
    fn from(kind: IndelKind) -> char {
        match kind {
            IndelKind::Insertion => 'I',
            IndelKind::Deletion => 'D',
        }
    }
}

impl TryFrom<char> for IndelKind {
    type Error = InvalidKindError;
    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            'I' => Ok(IndelKind::Insertion),
            'D' => Ok(IndelKind::Deletion),
            _ => Err(InvalidKindError::new(c)),
        }
    }
}

impl fmt::Display for IndelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(*self))
    }
}

/// One indel occurrence in compact positional encoding
///
/// The compact form is `<position>M<length><kind>`. `22M1D` is a 1 bp
/// deletion at position 22 of the reference.
///
/// By convention, positions are 1-based and lengths are in base pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndelToken {
    pub position: usize,
    pub length: usize,
    pub kind: IndelKind,
}

impl IndelToken {
    pub fn new(position: usize, length: usize, kind: IndelKind) -> Result<Self, ParseError> {
        if length == 0 {
            Err(ParseError::somewhere("length > 0", length.to_string()))
        } else {
            Ok(Self {
                position,
                length,
                kind,
            })
        }
    }

    /// Decode a compact string like `22M1D`
    ///
    /// The string is split on the literal `M`. The last character of the
    /// second half is the kind letter and everything before it is the length.
    /// Whitespace around the position is tolerated.
    pub fn parse(compact: &str) -> Result<Self, ParseError> {
        let parts: Vec<&str> = compact.split('M').collect();
        if parts.len() != 2 {
            return Err(ParseError::somewhere(
                "<position>M<length><kind>",
                compact.to_string(),
            ));
        }
        // we now know for sure that parts is of length 2

        let position = match parts[0].trim().parse::<usize>() {
            Ok(position) => position,
            Err(_) => return Err(ParseError::somewhere("usize", parts[0].to_string())),
        };

        let mut detail = parts[1].chars();
        let kind_letter = match detail.next_back() {
            Some(c) => c,
            None => {
                return Err(ParseError::somewhere(
                    "<length><kind>",
                    parts[1].to_string(),
                ))
            }
        };
        let kind = IndelKind::try_from(kind_letter)?;
        let length = match detail.as_str().parse::<usize>() {
            Ok(length) => length,
            Err(_) => return Err(ParseError::somewhere("usize", detail.as_str().to_string())),
        };

        IndelToken::new(position, length, kind)
    }
}

impl fmt::Display for IndelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}M{}{}", self.position, self.length, self.kind)
    }
}

//! Face-Turn Notation
//!
//! Standard outer-block notation for cube puzzles: a face letter followed by
//! an optional modifier (`'` counter-clockwise, `2` half turn).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Axis through a pair of opposite faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Up / Down
    UD,
    /// Left / Right
    LR,
    /// Front / Back
    FB,
}

/// Outer face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Face {
    /// Up
    U,
    /// Down
    D,
    /// Left
    L,
    /// Right
    R,
    /// Front
    F,
    /// Back
    B,
}

impl Face {
    /// All faces in canonical order.
    pub const ALL: [Face; 6] = [Face::U, Face::D, Face::L, Face::R, Face::F, Face::B];

    /// The face across the cube.
    pub const fn opposite(self) -> Face {
        match self {
            Face::U => Face::D,
            Face::D => Face::U,
            Face::L => Face::R,
            Face::R => Face::L,
            Face::F => Face::B,
            Face::B => Face::F,
        }
    }

    /// Axis this face turns about.
    pub const fn axis(self) -> Axis {
        match self {
            Face::U | Face::D => Axis::UD,
            Face::L | Face::R => Axis::LR,
            Face::F | Face::B => Axis::FB,
        }
    }

    /// Notation letter.
    pub const fn as_char(self) -> char {
        match self {
            Face::U => 'U',
            Face::D => 'D',
            Face::L => 'L',
            Face::R => 'R',
            Face::F => 'F',
            Face::B => 'B',
        }
    }

    /// Parse a notation letter.
    pub fn from_char(c: char) -> Option<Face> {
        match c {
            'U' => Some(Face::U),
            'D' => Some(Face::D),
            'L' => Some(Face::L),
            'R' => Some(Face::R),
            'F' => Some(Face::F),
            'B' => Some(Face::B),
            _ => None,
        }
    }
}

/// Turn amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Modifier {
    /// Quarter turn clockwise.
    None,
    /// Quarter turn counter-clockwise.
    Prime,
    /// Half turn.
    Double,
}

impl Modifier {
    /// All modifiers.
    pub const ALL: [Modifier; 3] = [Modifier::None, Modifier::Prime, Modifier::Double];

    /// Notation suffix.
    pub const fn suffix(self) -> &'static str {
        match self {
            Modifier::None => "",
            Modifier::Prime => "'",
            Modifier::Double => "2",
        }
    }
}

/// A single face turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    /// Face turned.
    pub face: Face,
    /// Turn amount.
    pub modifier: Modifier,
}

impl Move {
    /// Create a move.
    pub const fn new(face: Face, modifier: Modifier) -> Self {
        Self { face, modifier }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.face.as_char(), self.modifier.suffix())
    }
}

/// Notation parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseMoveError {
    /// Empty token.
    #[error("empty move")]
    Empty,
    /// Unknown face letter.
    #[error("unknown face in move {0:?}")]
    UnknownFace(String),
    /// Unknown modifier suffix.
    #[error("unknown modifier in move {0:?}")]
    UnknownModifier(String),
}

impl FromStr for Move {
    type Err = ParseMoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let face_char = chars.next().ok_or(ParseMoveError::Empty)?;
        let face = Face::from_char(face_char).ok_or_else(|| ParseMoveError::UnknownFace(s.to_string()))?;

        let modifier = match chars.as_str() {
            "" => Modifier::None,
            "'" => Modifier::Prime,
            "2" => Modifier::Double,
            _ => return Err(ParseMoveError::UnknownModifier(s.to_string())),
        };
        Ok(Move::new(face, modifier))
    }
}

/// An ordered list of moves. Serialized as its space-separated notation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ScrambleSequence(Vec<Move>);

impl ScrambleSequence {
    /// Wrap a list of moves.
    pub fn new(moves: Vec<Move>) -> Self {
        Self(moves)
    }

    /// Moves in order.
    pub fn moves(&self) -> &[Move] {
        &self.0
    }

    /// Number of moves.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the sequence has no moves.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ScrambleSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, mv) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{mv}")?;
        }
        Ok(())
    }
}

impl FromStr for ScrambleSequence {
    type Err = ParseMoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<Move>, _>>()
            .map(ScrambleSequence)
    }
}

impl Serialize for ScrambleSequence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ScrambleSequence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

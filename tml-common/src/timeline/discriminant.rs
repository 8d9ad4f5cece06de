//! Category/subtype discriminant and schema dispatch

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CodecError;

/// Timeline category (`cat` column); the numbering is an external contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Category {
    /// Friend relations and group activity (split further by subtype)
    Relation = 1,
    Wiki = 2,
    Subject = 3,
    Progress = 4,
    Say = 5,
    Blog = 6,
    Index = 7,
    Mono = 8,
    Doujin = 9,
}

impl Category {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Category {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Category::Relation,
            2 => Category::Wiki,
            3 => Category::Subject,
            4 => Category::Progress,
            5 => Category::Say,
            6 => Category::Blog,
            7 => Category::Index,
            8 => Category::Mono,
            9 => Category::Doujin,
            other => return Err(format!("unknown timeline category {}", other)),
        })
    }
}

impl From<Category> for u8 {
    fn from(c: Category) -> Self {
        c as u8
    }
}

/// The (category, subtype) pair stored next to every memo/image blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Discriminant {
    pub category: u8,
    pub subtype: u16,
}

impl Discriminant {
    pub const fn new(category: u8, subtype: u16) -> Self {
        Self { category, subtype }
    }

    /// Resolve to the schema that governs this blob
    ///
    /// Unknown pairs are an error: guessing a schema would corrupt an
    /// unrelated activity type.
    pub fn resolve(self) -> Result<MemoKind, CodecError> {
        use MemoKind::*;
        let kind = match (self.category, self.subtype) {
            (1, 2) => Relation,
            (1, 3) | (1, 4) => Group,
            (2, _) => Wiki,
            (3, _) => Subject,
            (4, _) => Progress,
            (5, 2) => SayEdit,
            (5, _) => Say,
            (6, _) => Blog,
            (7, _) => Index,
            (8, _) => Mono,
            (9, _) => Doujin,
            (category, subtype) => {
                return Err(CodecError::UnsupportedDiscriminant { category, subtype })
            }
        };
        Ok(kind)
    }
}

impl fmt::Display for Discriminant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(cat: {}, type: {})", self.category, self.subtype)
    }
}

/// One memo schema per discriminant class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoKind {
    Relation,
    Group,
    Wiki,
    Subject,
    Progress,
    /// Plain text status, stored raw (not grammar encoded)
    Say,
    SayEdit,
    Blog,
    Index,
    Mono,
    Doujin,
}

impl MemoKind {
    pub fn name(self) -> &'static str {
        match self {
            MemoKind::Relation => "relation",
            MemoKind::Group => "group",
            MemoKind::Wiki => "wiki",
            MemoKind::Subject => "subject",
            MemoKind::Progress => "progress",
            MemoKind::Say => "say",
            MemoKind::SayEdit => "say_edit",
            MemoKind::Blog => "blog",
            MemoKind::Index => "index",
            MemoKind::Mono => "mono",
            MemoKind::Doujin => "doujin",
        }
    }

    /// Discriminant the producer writes when creating this kind
    pub fn default_discriminant(self) -> Discriminant {
        let (category, subtype) = match self {
            MemoKind::Relation => (1, 2),
            MemoKind::Group => (1, 3),
            MemoKind::Wiki => (2, 0),
            MemoKind::Subject => (3, 0),
            MemoKind::Progress => (4, 0),
            MemoKind::Say => (5, 1),
            MemoKind::SayEdit => (5, 2),
            MemoKind::Blog => (6, 0),
            MemoKind::Index => (7, 0),
            MemoKind::Mono => (8, 1),
            MemoKind::Doujin => (9, 0),
        };
        Discriminant::new(category, subtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every discriminant present in stored data
    const KNOWN: &[(u8, u16, MemoKind)] = &[
        (1, 2, MemoKind::Relation),
        (1, 3, MemoKind::Group),
        (1, 4, MemoKind::Group),
        (2, 0, MemoKind::Wiki),
        (3, 0, MemoKind::Subject),
        (3, 14, MemoKind::Subject),
        (4, 0, MemoKind::Progress),
        (5, 1, MemoKind::Say),
        (5, 2, MemoKind::SayEdit),
        (6, 0, MemoKind::Blog),
        (7, 0, MemoKind::Index),
        (8, 1, MemoKind::Mono),
        (9, 0, MemoKind::Doujin),
    ];

    #[test]
    fn test_resolve_known_pairs() {
        for &(cat, typ, kind) in KNOWN {
            assert_eq!(Discriminant::new(cat, typ).resolve(), Ok(kind), "({}, {})", cat, typ);
        }
    }

    #[test]
    fn test_resolve_unknown_pairs_is_error() {
        for (cat, typ) in [(0, 0), (1, 0), (1, 1), (1, 5), (10, 0), (255, 3)] {
            assert_eq!(
                Discriminant::new(cat, typ).resolve(),
                Err(CodecError::UnsupportedDiscriminant {
                    category: cat,
                    subtype: typ
                })
            );
        }
    }

    #[test]
    fn test_default_discriminant_resolves_back() {
        for &(_, _, kind) in KNOWN {
            assert_eq!(kind.default_discriminant().resolve(), Ok(kind));
        }
    }

    #[test]
    fn test_category_numbering() {
        assert_eq!(Category::try_from(3), Ok(Category::Subject));
        assert_eq!(Category::Doujin.as_u8(), 9);
        assert!(Category::try_from(0).is_err());
        assert!(Category::try_from(10).is_err());
    }
}

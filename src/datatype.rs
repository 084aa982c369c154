//! The closed set of data types in the Dragonforge language.
//!
//! Grouping predicates (`Numeric`, `Integer`, `Iterable`) are used throughout
//! the checker and evaluator and are kept as methods rather than separate
//! sets so they can never drift out of sync with the enum.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    UByte,
    Byte,
    UWord,
    Word,
    Float,
    Str,
    StrS,
    ArrayUb,
    ArrayB,
    ArrayUw,
    ArrayW,
    ArrayF,
}

impl DataType {
    pub fn is_byte(self) -> bool {
        matches!(self, DataType::UByte | DataType::Byte)
    }

    pub fn is_word(self) -> bool {
        matches!(self, DataType::UWord | DataType::Word)
    }

    pub fn is_float(self) -> bool {
        matches!(self, DataType::Float)
    }

    /// Integer = Byte ∪ Word
    pub fn is_integer(self) -> bool {
        self.is_byte() || self.is_word()
    }

    /// Numeric = Byte ∪ Word ∪ {Float}
    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_unsigned(self) -> bool {
        matches!(self, DataType::UByte | DataType::UWord)
    }

    pub fn is_signed(self) -> bool {
        matches!(self, DataType::Byte | DataType::Word)
    }

    pub fn is_string(self) -> bool {
        matches!(self, DataType::Str | DataType::StrS)
    }

    pub fn is_array(self) -> bool {
        matches!(
            self,
            DataType::ArrayUb
                | DataType::ArrayB
                | DataType::ArrayUw
                | DataType::ArrayW
                | DataType::ArrayF
        )
    }

    /// Iterable = String ∪ Array
    pub fn is_iterable(self) -> bool {
        self.is_string() || self.is_array()
    }

    pub fn is_on_heap(self) -> bool {
        self.is_string() || self.is_array()
    }

    /// Integer value range, inclusive, for byte/word types. `None` for
    /// non-integer types.
    pub fn integer_range(self) -> Option<(i64, i64)> {
        match self {
            DataType::UByte => Some((0, 255)),
            DataType::Byte => Some((-128, 127)),
            DataType::UWord => Some((0, 65535)),
            DataType::Word => Some((-32768, 32767)),
            _ => None,
        }
    }

    /// Maximum element count for array types (declared size must fall in
    /// `1..=max`), per spec §3's per-type bounds.
    pub fn array_max_elements(self) -> Option<usize> {
        match self {
            DataType::ArrayUb | DataType::ArrayB => Some(256),
            DataType::ArrayUw | DataType::ArrayW => Some(128),
            DataType::ArrayF => Some(51),
            _ => None,
        }
    }

    pub fn array_element_type(self) -> Option<DataType> {
        match self {
            DataType::ArrayUb => Some(DataType::UByte),
            DataType::ArrayB => Some(DataType::Byte),
            DataType::ArrayUw => Some(DataType::UWord),
            DataType::ArrayW => Some(DataType::Word),
            DataType::ArrayF => Some(DataType::Float),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::UByte => "ubyte",
            DataType::Byte => "byte",
            DataType::UWord => "uword",
            DataType::Word => "word",
            DataType::Float => "float",
            DataType::Str => "str",
            DataType::StrS => "str_s",
            DataType::ArrayUb => "array_ub",
            DataType::ArrayB => "array_b",
            DataType::ArrayUw => "array_uw",
            DataType::ArrayW => "array_w",
            DataType::ArrayF => "array_f",
        };
        write!(f, "{}", name)
    }
}

/// MFLPT float bounds, per GLOSSARY: a 5-byte format with this representable
/// magnitude range.
pub const MFLPT_MAX: f64 = 1.7014118345e38;

pub fn float_in_range(x: f64) -> bool {
    x.abs() <= MFLPT_MAX
}

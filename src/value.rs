//! Literal values and the canonical-construction helpers in spec §4.A.

use crate::datatype::{float_in_range, DataType};
use crate::errors::CompileError;
use crate::heap::HeapId;
use crate::position::Position;
use serde::{Deserialize, Serialize};

/// Exactly one of these fields is populated, consistent with `dtype`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueBits {
    Byte(i8),
    UByte(u8),
    Word(i16),
    UWord(u16),
    Float(f64),
    Heap(HeapId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralValue {
    pub dtype: DataType,
    pub bits: ValueBits,
    pub position: Position,
}

impl LiteralValue {
    pub fn new(dtype: DataType, bits: ValueBits, position: Position) -> Self {
        LiteralValue {
            dtype,
            bits,
            position,
        }
    }

    pub fn ubyte(v: u8, position: Position) -> Self {
        LiteralValue::new(DataType::UByte, ValueBits::UByte(v), position)
    }

    pub fn byte(v: i8, position: Position) -> Self {
        LiteralValue::new(DataType::Byte, ValueBits::Byte(v), position)
    }

    pub fn uword(v: u16, position: Position) -> Self {
        LiteralValue::new(DataType::UWord, ValueBits::UWord(v), position)
    }

    pub fn word(v: i16, position: Position) -> Self {
        LiteralValue::new(DataType::Word, ValueBits::Word(v), position)
    }

    pub fn float(v: f64, position: Position) -> Self {
        LiteralValue::new(DataType::Float, ValueBits::Float(v), position)
    }

    pub fn heap(dtype: DataType, id: HeapId, position: Position) -> Self {
        LiteralValue::new(dtype, ValueBits::Heap(id), position)
    }

    /// `fromBoolean`: UBYTE 1/0.
    pub fn from_boolean(b: bool, position: Position) -> Self {
        LiteralValue::ubyte(b as u8, position)
    }

    /// Sign-extended integer value, for integral types only.
    pub fn as_integer_value(&self) -> Option<i64> {
        match self.bits {
            ValueBits::UByte(v) => Some(v as i64),
            ValueBits::Byte(v) => Some(v as i64),
            ValueBits::UWord(v) => Some(v as i64),
            ValueBits::Word(v) => Some(v as i64),
            _ => None,
        }
    }

    /// Float-coerced numeric value, for any numeric type.
    pub fn as_numeric_value(&self) -> Option<f64> {
        match self.bits {
            ValueBits::Float(v) => Some(v),
            _ => self.as_integer_value().map(|v| v as f64),
        }
    }

    /// Nonzero-truthiness, for numeric types.
    pub fn as_boolean_value(&self) -> Option<bool> {
        self.as_numeric_value().map(|v| v != 0.0)
    }

    pub fn heap_id(&self) -> Option<HeapId> {
        match self.bits {
            ValueBits::Heap(id) => Some(id),
            _ => None,
        }
    }
}

/// `optimalInteger`: the smallest integer type that contains `n`.
pub fn optimal_integer(n: i64, position: Position) -> Result<LiteralValue, CompileError> {
    if (0..=255).contains(&n) {
        Ok(LiteralValue::ubyte(n as u8, position))
    } else if (-128..0).contains(&n) {
        Ok(LiteralValue::byte(n as i8, position))
    } else if (0..=65535).contains(&n) {
        Ok(LiteralValue::uword(n as u16, position))
    } else if (-32768..0).contains(&n) {
        Ok(LiteralValue::word(n as i16, position))
    } else {
        Err(CompileError::expression(
            format!("integer value {} is out of range for any numeric type", n),
            position,
        ))
    }
}

/// `optimalNumeric`: FLOAT if fractional or out of integer range, else
/// delegates to `optimal_integer`.
pub fn optimal_numeric(x: f64, position: Position) -> Result<LiteralValue, CompileError> {
    let is_integral = x.fract() == 0.0 && x >= -32768.0 && x <= 65535.0;
    if is_integral {
        optimal_integer(x as i64, position)
    } else if float_in_range(x) {
        Ok(LiteralValue::float(x, position))
    } else {
        Err(CompileError::expression(
            format!("float value {} is out of the representable MFLPT range", x),
            position,
        ))
    }
}

/// `fromNumber`: coerce `n` into `dtype` with bounds checking.
pub fn from_number(n: f64, dtype: DataType, position: Position) -> Result<LiteralValue, CompileError> {
    match dtype {
        DataType::Float => {
            if !float_in_range(n) {
                return Err(CompileError::expression(
                    format!("float value {} is out of the representable MFLPT range", n),
                    position,
                ));
            }
            Ok(LiteralValue::float(n, position))
        }
        _ => {
            let (lo, hi) = dtype
                .integer_range()
                .ok_or_else(|| CompileError::expression("not a numeric type".to_string(), position.clone()))?;
            let i = n as i64;
            if (i as f64) != n || i < lo || i > hi {
                return Err(CompileError::expression(
                    format!("value {} does not fit in {}", n, dtype),
                    position,
                ));
            }
            match dtype {
                DataType::UByte => Ok(LiteralValue::ubyte(i as u8, position)),
                DataType::Byte => Ok(LiteralValue::byte(i as i8, position)),
                DataType::UWord => Ok(LiteralValue::uword(i as u16, position)),
                DataType::Word => Ok(LiteralValue::word(i as i16, position)),
                _ => unreachable!(),
            }
        }
    }
}

/// Two literal values are equal iff their canonical numeric or heap
/// contents are equal; cross-type numeric comparisons compare by value.
/// String equality-by-content (not heap-id) must be resolved by the caller
/// via `Heap::strings_equal`, since that requires heap access this type
/// doesn't carry.
pub fn numeric_values_equal(a: &LiteralValue, b: &LiteralValue) -> Option<bool> {
    match (a.as_numeric_value(), b.as_numeric_value()) {
        (Some(x), Some(y)) => Some(x == y),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> Position {
        Position::synthetic()
    }

    #[test]
    fn optimal_integer_picks_smallest_type() {
        assert_eq!(optimal_integer(0, pos()).unwrap().dtype, DataType::UByte);
        assert_eq!(optimal_integer(255, pos()).unwrap().dtype, DataType::UByte);
        assert_eq!(optimal_integer(-1, pos()).unwrap().dtype, DataType::Byte);
        assert_eq!(optimal_integer(256, pos()).unwrap().dtype, DataType::UWord);
        assert_eq!(optimal_integer(-129, pos()).unwrap().dtype, DataType::Word);
    }

    #[test]
    fn optimal_integer_never_narrows() {
        // Boundary case from spec §8: 255 + 1 folds to UWORD 256, promoting
        // rather than overflowing.
        let v = optimal_integer(256, pos()).unwrap();
        let (lo, hi) = v.dtype.integer_range().unwrap();
        assert!(lo <= 256 && 256 <= hi);
    }

    #[test]
    fn optimal_integer_overflow_is_fatal() {
        assert!(optimal_integer(i64::MAX, pos()).is_err());
    }

    #[test]
    fn optimal_numeric_promotes_fractional_to_float() {
        let v = optimal_numeric(1.5, pos()).unwrap();
        assert_eq!(v.dtype, DataType::Float);
    }

    #[test]
    fn cross_type_numeric_equality() {
        let ub = LiteralValue::ubyte(5, pos());
        let w = LiteralValue::word(5, pos());
        assert_eq!(numeric_values_equal(&ub, &w), Some(true));
    }
}

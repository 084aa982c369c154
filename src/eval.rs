//! Constant expression evaluator (spec §4.D).
//!
//! Used by the expression optimizer to fold literal subtrees. Every
//! operation here is pure and total over its documented domain; anything
//! outside that domain (division by zero, an out-of-range shift count)
//! raises a `CompileError::Expression` that the caller accumulates rather
//! than panicking, since these are user-reachable mistakes, not internal
//! invariant violations.

use crate::ast::{BinOp, PrefixOp};
use crate::datatype::DataType;
use crate::errors::CompileError;
use crate::heap::Heap;
use crate::position::Position;
use crate::value::{optimal_integer, optimal_numeric, LiteralValue, ValueBits};

/// Evaluates a binary operation over two constant operands.
///
/// Numeric promotion: if either operand is FLOAT, the result is computed in
/// f64 and re-narrowed with `optimal_numeric`; otherwise the result is
/// computed in i64 and re-narrowed with `optimal_integer`. String `+`
/// concatenates via the heap; everything else on strings/arrays is rejected.
pub fn evaluate(
    left: &LiteralValue,
    op: BinOp,
    right: &LiteralValue,
    heap: &mut Heap,
    position: Position,
) -> Result<LiteralValue, CompileError> {
    if left.dtype.is_string() && right.dtype.is_string() {
        return evaluate_string(left, op, right, heap, position);
    }
    if op == BinOp::Mul
        && ((left.dtype.is_string() && right.dtype.is_integer())
            || (left.dtype.is_integer() && right.dtype.is_string()))
    {
        return evaluate_string_repeat(left, right, heap, position);
    }
    if !left.dtype.is_numeric() || !right.dtype.is_numeric() {
        return Err(CompileError::expression(
            format!(
                "cannot apply operator '{}' to {} and {}",
                op.as_str(),
                left.dtype,
                right.dtype
            ),
            position,
        ));
    }

    if op.is_comparison() {
        return evaluate_comparison(left, op, right, position);
    }

    let uses_float = left.dtype.is_float() || right.dtype.is_float();
    if uses_float && (op.is_bitwise() || op.is_shift()) {
        return Err(CompileError::expression(
            format!("operator '{}' requires an integer operand", op.as_str()),
            position,
        ));
    }

    if uses_float {
        let a = left.as_numeric_value().unwrap();
        let b = right.as_numeric_value().unwrap();
        let result = match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => {
                if b == 0.0 {
                    return Err(CompileError::expression("division by zero", position));
                }
                a / b
            }
            BinOp::Mod => {
                if b == 0.0 {
                    return Err(CompileError::expression("division by zero", position));
                }
                a % b
            }
            BinOp::Pow => a.powf(b),
            BinOp::And | BinOp::Or | BinOp::Xor => {
                return evaluate_logical(a != 0.0, op, b != 0.0, position)
            }
            _ => unreachable!("handled above"),
        };
        return optimal_numeric(result, position);
    }

    let a = left.as_integer_value().unwrap();
    let b = right.as_integer_value().unwrap();

    if matches!(op, BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor) {
        // Bitwise narrowing follows the left operand's declared width (spec
        // §4.D): each operand is masked to that width before the op runs,
        // and the result stays at that exact type. Going through
        // `optimal_integer`'s smallest-fitting-type logic here would let a
        // sign-extended i64 escape into the wrong type, e.g. mixing
        // UBYTE(0x0F) with BYTE(-1) would sign-extend -1 to all-ones and
        // re-narrow to BYTE -1 instead of the UBYTE 0xFF the left operand's
        // width mandates.
        let width_mask: i64 = if left.dtype.is_byte() { 0xFF } else { 0xFFFF };
        let am = a & width_mask;
        let bm = b & width_mask;
        let raw = match op {
            BinOp::BitAnd => {
                // Open Question (spec §9): on UWORD operands, '&' is
                // specified to behave as logical 'or' for historical
                // compatibility with the reference compiler's constant
                // folder. Preserved literally rather than "fixed", since
                // downstream code may depend on it.
                if left.dtype == DataType::UWord && right.dtype == DataType::UWord {
                    am | bm
                } else {
                    am & bm
                }
            }
            BinOp::BitOr => am | bm,
            BinOp::BitXor => am ^ bm,
            _ => unreachable!(),
        };
        return Ok(narrow_to_width(left.dtype, raw, position));
    }

    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0 {
                return Err(CompileError::expression("division by zero", position));
            }
            a / b
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(CompileError::expression("division by zero", position));
            }
            a % b
        }
        BinOp::Pow => a.checked_pow(b.max(0) as u32).ok_or_else(|| {
            CompileError::expression("integer power overflow", position.clone())
        })?,
        BinOp::Shl => {
            if !(0..64).contains(&b) {
                return Err(CompileError::expression("shift amount out of range", position));
            }
            a << b
        }
        BinOp::Shr => {
            if !(0..64).contains(&b) {
                return Err(CompileError::expression("shift amount out of range", position));
            }
            a >> b
        }
        BinOp::And | BinOp::Or | BinOp::Xor => return evaluate_logical(a != 0, op, b != 0, position),
        _ => unreachable!("handled above"),
    };
    optimal_integer(result, position)
}

/// Reinterprets an already width-masked, non-negative `raw` bit pattern as
/// `dtype`, picking the signed/unsigned representation that type carries
/// rather than `optimal_integer`'s smallest-fitting-type search. Used by
/// the bitwise operators, whose result type is fixed to the left operand's
/// width regardless of how small the masked value happens to be.
fn narrow_to_width(dtype: DataType, raw: i64, position: Position) -> LiteralValue {
    match dtype {
        DataType::UByte => LiteralValue::ubyte(raw as u8, position),
        DataType::Byte => LiteralValue::byte(raw as u8 as i8, position),
        DataType::UWord => LiteralValue::uword(raw as u16, position),
        DataType::Word => LiteralValue::word(raw as u16 as i16, position),
        _ => unreachable!("bitwise operators only run on byte/word integer operands"),
    }
}

fn evaluate_logical(
    a: bool,
    op: BinOp,
    b: bool,
    position: Position,
) -> Result<LiteralValue, CompileError> {
    let result = match op {
        BinOp::And => a && b,
        BinOp::Or => a || b,
        BinOp::Xor => a != b,
        _ => unreachable!(),
    };
    Ok(LiteralValue::from_boolean(result, position))
}

fn evaluate_comparison(
    left: &LiteralValue,
    op: BinOp,
    right: &LiteralValue,
    position: Position,
) -> Result<LiteralValue, CompileError> {
    let a = left.as_numeric_value().unwrap();
    let b = right.as_numeric_value().unwrap();
    let result = match op {
        BinOp::Lt => a < b,
        BinOp::Gt => a > b,
        BinOp::Le => a <= b,
        BinOp::Ge => a >= b,
        BinOp::Eq => a == b,
        BinOp::Ne => a != b,
        _ => unreachable!(),
    };
    Ok(LiteralValue::from_boolean(result, position))
}

fn evaluate_string(
    left: &LiteralValue,
    op: BinOp,
    right: &LiteralValue,
    heap: &mut Heap,
    position: Position,
) -> Result<LiteralValue, CompileError> {
    let (Some(a), Some(b)) = (left.heap_id(), right.heap_id()) else {
        return Err(CompileError::expression("malformed string literal", position));
    };
    match op {
        BinOp::Add => {
            let text = match (heap.get(a), heap.get(b)) {
                (
                    Some(crate::heap::HeapEntry::Str { value: v1, .. }),
                    Some(crate::heap::HeapEntry::Str { value: v2, .. }),
                ) => format!("{v1}{v2}"),
                _ => {
                    return Err(CompileError::expression(
                        "string concatenation requires string operands",
                        position,
                    ))
                }
            };
            if text.len() > 255 {
                return Err(CompileError::expression(
                    format!("string too long: result has {} bytes, maximum is 255", text.len()),
                    position,
                ));
            }
            let id = heap.alloc_string(text, false);
            Ok(LiteralValue::heap(left.dtype, id, position))
        }
        BinOp::Eq | BinOp::Ne => {
            let equal = heap.strings_equal(a, b);
            let result = if op == BinOp::Eq { equal } else { !equal };
            Ok(LiteralValue::from_boolean(result, position))
        }
        _ => Err(CompileError::expression(
            format!("operator '{}' is not defined on strings", op.as_str()),
            position,
        )),
    }
}

/// `Integer * STR` / `STR * Integer` repetition (spec §4.D). The repeat
/// count must not be negative, and the result is subject to the same
/// 255-byte "string too long" limit as concatenation.
fn evaluate_string_repeat(
    left: &LiteralValue,
    right: &LiteralValue,
    heap: &mut Heap,
    position: Position,
) -> Result<LiteralValue, CompileError> {
    let (str_val, count) = if left.dtype.is_string() {
        (left, right.as_integer_value().unwrap())
    } else {
        (right, left.as_integer_value().unwrap())
    };
    if count < 0 {
        return Err(CompileError::expression(
            "string repeat count must not be negative",
            position,
        ));
    }
    let id = str_val
        .heap_id()
        .ok_or_else(|| CompileError::expression("malformed string literal", position.clone()))?;
    let text = match heap.get(id) {
        Some(crate::heap::HeapEntry::Str { value, .. }) => value.clone(),
        _ => return Err(CompileError::expression("malformed string literal", position)),
    };
    let repeated = text.repeat(count as usize);
    if repeated.len() > 255 {
        return Err(CompileError::expression(
            format!("string too long: result has {} bytes, maximum is 255", repeated.len()),
            position,
        ));
    }
    let new_id = heap.alloc_string(repeated, false);
    Ok(LiteralValue::heap(str_val.dtype, new_id, position))
}

/// Evaluates a unary prefix operation over a constant operand.
pub fn evaluate_prefix(
    op: PrefixOp,
    value: &LiteralValue,
    position: Position,
) -> Result<LiteralValue, CompileError> {
    if !value.dtype.is_numeric() {
        return Err(CompileError::expression(
            format!("cannot apply unary '{:?}' to {}", op, value.dtype),
            position,
        ));
    }
    match op {
        PrefixOp::Plus => Ok(value.clone()),
        PrefixOp::Neg => {
            if value.dtype.is_float() {
                optimal_numeric(-value.as_numeric_value().unwrap(), position)
            } else {
                optimal_integer(-value.as_integer_value().unwrap(), position)
            }
        }
        PrefixOp::Invert => {
            if value.dtype.is_float() {
                return Err(CompileError::expression(
                    "bitwise invert requires an integer operand",
                    position,
                ));
            }
            optimal_integer(!value.as_integer_value().unwrap(), position)
        }
        PrefixOp::Not => Ok(LiteralValue::from_boolean(
            !value.as_boolean_value().unwrap(),
            position,
        )),
    }
}

/// Materializes a constant `Range` expression's bounds into a concrete
/// `(start, stop, step)` triple, matching the for-loop lowering rules in
/// spec §4.G. `step` defaults to 1 (or -1 when `to < from`) when omitted.
pub fn materialize_range(from: i64, to: i64, step: Option<i64>) -> Result<(i64, i64, i64), CompileError> {
    let step = step.unwrap_or(if to < from { -1 } else { 1 });
    if step == 0 {
        return Err(CompileError::expression(
            "range step must not be zero",
            Position::synthetic(),
        ));
    }
    if (step > 0 && to < from) || (step < 0 && to > from) {
        return Err(CompileError::expression(
            "range step direction does not match bounds",
            Position::synthetic(),
        ));
    }
    Ok((from, to, step))
}

/// bits/value representation helper used only by tests in this module and
/// by the optimizer's sanity checks.
pub fn bits_of(value: &LiteralValue) -> &ValueBits {
    &value.bits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> Position {
        Position::synthetic()
    }

    #[test]
    fn add_two_ubytes_promotes_on_overflow() {
        let mut heap = Heap::new();
        let a = LiteralValue::ubyte(255, pos());
        let b = LiteralValue::ubyte(1, pos());
        let result = evaluate(&a, BinOp::Add, &b, &mut heap, pos()).unwrap();
        assert_eq!(result.dtype, DataType::UWord);
        assert_eq!(result.as_integer_value(), Some(256));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let mut heap = Heap::new();
        let a = LiteralValue::ubyte(1, pos());
        let b = LiteralValue::ubyte(0, pos());
        assert!(evaluate(&a, BinOp::Div, &b, &mut heap, pos()).is_err());
    }

    #[test]
    fn uword_bitand_behaves_as_logical_or() {
        let mut heap = Heap::new();
        let a = LiteralValue::uword(0b1100, pos());
        let b = LiteralValue::uword(0b1010, pos());
        let result = evaluate(&a, BinOp::BitAnd, &b, &mut heap, pos()).unwrap();
        assert_eq!(result.as_integer_value(), Some(0b1110));
    }

    #[test]
    fn byte_bitand_is_ordinary_and() {
        let mut heap = Heap::new();
        let a = LiteralValue::ubyte(0b1100, pos());
        let b = LiteralValue::ubyte(0b1010, pos());
        let result = evaluate(&a, BinOp::BitAnd, &b, &mut heap, pos()).unwrap();
        assert_eq!(result.as_integer_value(), Some(0b1000));
    }

    #[test]
    fn bitor_narrows_to_the_left_operands_width_not_the_right() {
        let mut heap = Heap::new();
        let a = LiteralValue::ubyte(0x0F, pos());
        let b = LiteralValue::byte(-1, pos());
        let result = evaluate(&a, BinOp::BitOr, &b, &mut heap, pos()).unwrap();
        assert_eq!(result.dtype, DataType::UByte);
        assert_eq!(result.as_integer_value(), Some(0xFF));
    }

    #[test]
    fn bitand_with_a_byte_left_operand_stays_signed() {
        let mut heap = Heap::new();
        let a = LiteralValue::byte(-1, pos());
        let b = LiteralValue::ubyte(0x0F, pos());
        let result = evaluate(&a, BinOp::BitAnd, &b, &mut heap, pos()).unwrap();
        assert_eq!(result.dtype, DataType::Byte);
        assert_eq!(result.as_integer_value(), Some(0x0F));
    }

    #[test]
    fn string_concatenation_allocates_new_heap_entry() {
        let mut heap = Heap::new();
        let a_id = heap.alloc_string("foo", false);
        let b_id = heap.alloc_string("bar", false);
        let a = LiteralValue::heap(DataType::Str, a_id, pos());
        let b = LiteralValue::heap(DataType::Str, b_id, pos());
        let result = evaluate(&a, BinOp::Add, &b, &mut heap, pos()).unwrap();
        let id = result.heap_id().unwrap();
        match heap.get(id) {
            Some(crate::heap::HeapEntry::Str { value, .. }) => assert_eq!(value, "foobar"),
            _ => panic!("expected string entry"),
        }
    }

    #[test]
    fn concatenation_past_255_bytes_is_a_compile_error() {
        let mut heap = Heap::new();
        let a_id = heap.alloc_string("a".repeat(200), false);
        let b_id = heap.alloc_string("b".repeat(100), false);
        let a = LiteralValue::heap(DataType::Str, a_id, pos());
        let b = LiteralValue::heap(DataType::Str, b_id, pos());
        assert!(evaluate(&a, BinOp::Add, &b, &mut heap, pos()).is_err());
    }

    #[test]
    fn integer_times_string_repeats_the_content() {
        let mut heap = Heap::new();
        let s_id = heap.alloc_string("ab", false);
        let s = LiteralValue::heap(DataType::Str, s_id, pos());
        let n = LiteralValue::ubyte(3, pos());
        let result = evaluate(&n, BinOp::Mul, &s, &mut heap, pos()).unwrap();
        let id = result.heap_id().unwrap();
        match heap.get(id) {
            Some(crate::heap::HeapEntry::Str { value, .. }) => assert_eq!(value, "ababab"),
            _ => panic!("expected string entry"),
        }
    }

    #[test]
    fn negate_flips_sign_and_renarrows() {
        let v = LiteralValue::ubyte(5, pos());
        let result = evaluate_prefix(PrefixOp::Neg, &v, pos()).unwrap();
        assert_eq!(result.dtype, DataType::Byte);
        assert_eq!(result.as_integer_value(), Some(-5));
    }

    #[test]
    fn materialize_range_defaults_step_from_direction() {
        assert_eq!(materialize_range(0, 5, None).unwrap(), (0, 5, 1));
        assert_eq!(materialize_range(5, 0, None).unwrap(), (5, 0, -1));
    }

    #[test]
    fn materialize_range_rejects_zero_step() {
        assert!(materialize_range(0, 5, Some(0)).is_err());
    }
}

//! Built-in function signatures (spec §4.G, §5 "built-in functions").
//!
//! The table is intentionally small and closed: Dragonforge does not let
//! user code register new built-ins, so a `LazyLock<HashMap<...>>` static
//! table (in the same style the teacher compiler used for its row-
//! polymorphic effect table) is enough — no trait object, no registration
//! API.

use crate::datatype::DataType;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Which data types a parameter slot accepts. Most built-ins accept any
/// numeric type and let the checker insert a widening typecast; a few are
/// pinned to a single type (e.g. `petscii` only accepts UBYTE).
#[derive(Debug, Clone, PartialEq)]
pub enum ParamClass {
    AnyNumeric,
    AnyInteger,
    Exactly(DataType),
    AnyIterable,
}

impl ParamClass {
    pub fn accepts(&self, dtype: DataType) -> bool {
        match self {
            ParamClass::AnyNumeric => dtype.is_numeric(),
            ParamClass::AnyInteger => dtype.is_integer(),
            ParamClass::Exactly(expected) => dtype == *expected,
            ParamClass::AnyIterable => dtype.is_iterable(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuiltinSignature {
    pub params: Vec<ParamClass>,
    /// Number of return values (0, 1, or 2 for register-pair results like
    /// `divmod`-style builtins; none of the current set need more).
    pub returns: u8,
    /// Whether this builtin can be constant-folded by the expression
    /// optimizer when every argument is a literal. I/O builtins
    /// (`c64.CHROUT`, `c64scr.print`) are never pure.
    pub pure: bool,
}

pub static BUILTINS: LazyLock<HashMap<&'static str, BuiltinSignature>> = LazyLock::new(|| {
    let mut m = HashMap::new();
    m.insert(
        "lsl",
        BuiltinSignature {
            params: vec![ParamClass::AnyInteger],
            returns: 1,
            pure: true,
        },
    );
    m.insert(
        "lsr",
        BuiltinSignature {
            params: vec![ParamClass::AnyInteger],
            returns: 1,
            pure: true,
        },
    );
    m.insert(
        "msb",
        BuiltinSignature {
            params: vec![ParamClass::Exactly(DataType::UWord)],
            returns: 1,
            pure: true,
        },
    );
    m.insert(
        "lsb",
        BuiltinSignature {
            params: vec![ParamClass::Exactly(DataType::UWord)],
            returns: 1,
            pure: true,
        },
    );
    m.insert(
        "swap",
        BuiltinSignature {
            params: vec![ParamClass::AnyNumeric, ParamClass::AnyNumeric],
            returns: 2,
            pure: false,
        },
    );
    m.insert(
        "petscii",
        BuiltinSignature {
            params: vec![ParamClass::Exactly(DataType::UByte)],
            returns: 1,
            pure: true,
        },
    );
    m.insert(
        "c64.CHROUT",
        BuiltinSignature {
            params: vec![ParamClass::Exactly(DataType::UByte)],
            returns: 0,
            pure: false,
        },
    );
    m.insert(
        "c64scr.print",
        BuiltinSignature {
            params: vec![ParamClass::AnyIterable],
            returns: 0,
            pure: false,
        },
    );
    m
});

pub fn lookup(name: &str) -> Option<&'static BuiltinSignature> {
    BUILTINS.get(name)
}

pub fn is_pure(name: &str) -> bool {
    lookup(name).map(|s| s.pure).unwrap_or(false)
}

/// Checks argument count and per-slot type compatibility; does not perform
/// widening itself (that's the checker's job once it knows the context).
pub fn arity_and_types_match(name: &str, arg_types: &[DataType]) -> bool {
    match lookup(name) {
        Some(sig) => {
            sig.params.len() == arg_types.len()
                && sig
                    .params
                    .iter()
                    .zip(arg_types.iter())
                    .all(|(class, ty)| class.accepts(*ty))
        }
        None => false,
    }
}

//! Number literal typing.
//!
//! A literal without a type suffix takes its type from the expectation: `3` expected as
//! `BigInteger` is an arbitrary-precision constant, `3` without expectation is an `int`.

use tessel_types::{PrimitiveType, TypeEnv, TypeRef};

/// How code generation materializes a number literal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LiteralRepresentation {
    /// A Java primitive literal.
    Machine,
    /// `new BigInteger(digits, radix)`.
    BigInteger { digits: String, radix: u32 },
    /// `new BigDecimal(digits)`.
    BigDecimal { digits: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Suffix {
    Long,
    Float,
    Double,
    BigInteger,
    BigDecimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct NumberLiteral {
    digits: String,
    radix: u32,
    suffix: Option<Suffix>,
    is_decimal: bool,
}

fn parse(text: &str) -> NumberLiteral {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();

    if let Some(hex) = lower.strip_prefix("0x") {
        // Hex digits overlap the suffix letters, so hex suffixes follow a `#`.
        let (digits, suffix) = match hex.split_once('#') {
            Some((digits, suffix)) => (digits, parse_suffix(suffix)),
            None => (hex, None),
        };
        return NumberLiteral {
            digits: digits.to_owned(),
            radix: 16,
            suffix,
            is_decimal: false,
        };
    }

    let (digits, suffix) = ["bi", "bd", "l", "f", "d"]
        .iter()
        .find_map(|s| lower.strip_suffix(s).map(|digits| (digits, parse_suffix(s))))
        .unwrap_or((lower.as_str(), None));
    NumberLiteral {
        digits: digits.to_owned(),
        radix: 10,
        suffix,
        is_decimal: digits.contains(['.', 'e']),
    }
}

fn parse_suffix(text: &str) -> Option<Suffix> {
    match text {
        "l" => Some(Suffix::Long),
        "f" => Some(Suffix::Float),
        "d" => Some(Suffix::Double),
        "bi" => Some(Suffix::BigInteger),
        "bd" => Some(Suffix::BigDecimal),
        _ => None,
    }
}

/// The type of the number literal `text` under the `expected` type.
pub(crate) fn literal_type(env: &dyn TypeEnv, text: &str, expected: Option<&TypeRef>) -> TypeRef {
    let wk = env.well_known();
    let literal = parse(text);
    let prim = |p: PrimitiveType| TypeRef::simple(wk.primitive(p));

    match literal.suffix {
        Some(Suffix::Long) => return prim(PrimitiveType::Long),
        Some(Suffix::Float) => return prim(PrimitiveType::Float),
        Some(Suffix::Double) => return prim(PrimitiveType::Double),
        Some(Suffix::BigInteger) => return TypeRef::simple(wk.big_integer),
        Some(Suffix::BigDecimal) => return TypeRef::simple(wk.big_decimal),
        None => {}
    }

    let expected_id = expected.and_then(TypeRef::type_id);
    if expected_id == Some(wk.big_decimal) {
        return TypeRef::simple(wk.big_decimal);
    }
    if expected_id == Some(wk.big_integer) && !literal.is_decimal {
        return TypeRef::simple(wk.big_integer);
    }
    let expected_prim = expected_id.and_then(|id| match env.type_def(id).map(|d| d.kind) {
        Some(tessel_types::TypeKind::Primitive(p)) => Some(p),
        _ => wk.unboxed(id),
    });

    if literal.is_decimal {
        return match expected_prim {
            Some(PrimitiveType::Float) => prim(PrimitiveType::Float),
            _ => prim(PrimitiveType::Double),
        };
    }
    match expected_prim {
        Some(PrimitiveType::Long) => prim(PrimitiveType::Long),
        _ => prim(PrimitiveType::Int),
    }
}

/// The representation of the literal `text` once its type is known.
pub(crate) fn representation(env: &dyn TypeEnv, text: &str, ty: &TypeRef) -> LiteralRepresentation {
    let wk = env.well_known();
    let literal = parse(text);
    if ty.is_type(wk.big_integer) {
        LiteralRepresentation::BigInteger {
            digits: literal.digits,
            radix: literal.radix,
        }
    } else if ty.is_type(wk.big_decimal) {
        LiteralRepresentation::BigDecimal {
            digits: literal.digits,
        }
    } else {
        LiteralRepresentation::Machine
    }
}

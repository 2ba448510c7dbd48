use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::{
    all_super_types, erasure, function_equivalent, identifier, instantiate_as_supertype,
    is_subtype_of, TypeEnv, TypeId, TypeKind, TypeRef,
};

/// How an actual type satisfied (or failed to satisfy) an expectation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConformanceHints(u16);

impl ConformanceHints {
    /// The actual type was checked against the expected type.
    pub const CHECKED: Self = Self(1 << 0);
    /// The actual type was recorded without checking it against the expectation.
    pub const UNCHECKED: Self = Self(1 << 1);
    /// The actual type was computed without consulting the expectation.
    pub const EXPECTATION_INDEPENDENT: Self = Self(1 << 2);
    pub const SUCCESS: Self = Self(1 << 3);
    pub const INCOMPATIBLE: Self = Self(1 << 4);
    pub const SUBTYPE: Self = Self(1 << 5);
    pub const WIDENING: Self = Self(1 << 6);
    pub const BOXING: Self = Self(1 << 7);
    pub const UNBOXING: Self = Self(1 << 8);
    pub const RAW_TYPE: Self = Self(1 << 9);
    /// The expression completes abruptly and contributes no value.
    pub const NO_VALUE: Self = Self(1 << 10);

    const NAMES: [(ConformanceHints, &'static str); 11] = [
        (Self::CHECKED, "CHECKED"),
        (Self::UNCHECKED, "UNCHECKED"),
        (Self::EXPECTATION_INDEPENDENT, "EXPECTATION_INDEPENDENT"),
        (Self::SUCCESS, "SUCCESS"),
        (Self::INCOMPATIBLE, "INCOMPATIBLE"),
        (Self::SUBTYPE, "SUBTYPE"),
        (Self::WIDENING, "WIDENING"),
        (Self::BOXING, "BOXING"),
        (Self::UNBOXING, "UNBOXING"),
        (Self::RAW_TYPE, "RAW_TYPE"),
        (Self::NO_VALUE, "NO_VALUE"),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        self.contains(Self::SUCCESS)
    }

    #[must_use]
    pub const fn is_incompatible(self) -> bool {
        self.contains(Self::INCOMPATIBLE)
    }
}

impl BitOr for ConformanceHints {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for ConformanceHints {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

impl fmt::Debug for ConformanceHints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConformanceHints(")?;
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        f.write_str(")")
    }
}

const MAX_DEPTH: usize = 32;

/// Checks whether a value of type `actual` may be used where `expected` is required.
///
/// The result always contains exactly one of [`ConformanceHints::SUCCESS`] and
/// [`ConformanceHints::INCOMPATIBLE`], plus the conversions that were needed.
pub fn conformance(env: &dyn TypeEnv, expected: &TypeRef, actual: &TypeRef) -> ConformanceHints {
    conformance_at(env, expected, actual, 0)
}

pub fn is_conformant(env: &dyn TypeEnv, expected: &TypeRef, actual: &TypeRef) -> bool {
    conformance(env, expected, actual).is_success()
}

fn conformance_at(
    env: &dyn TypeEnv,
    expected: &TypeRef,
    actual: &TypeRef,
    depth: usize,
) -> ConformanceHints {
    use ConformanceHints as H;

    if depth > MAX_DEPTH {
        return H::INCOMPATIBLE;
    }
    let depth = depth + 1;
    let wk = env.well_known();
    let expected = expected.resolved();
    let actual = actual.resolved();
    if expected == actual {
        return H::SUCCESS;
    }

    match (expected, actual) {
        (TypeRef::Any, _) => return H::SUCCESS,
        (_, TypeRef::Any) => {
            return if expected.primitive(env).is_some() || expected.is_void(env) {
                H::INCOMPATIBLE
            } else {
                H::SUCCESS
            };
        }
        (TypeRef::Multi(parts), _) => {
            return parts
                .iter()
                .map(|part| conformance_at(env, part, actual, depth))
                .find(|hints| hints.is_success())
                .unwrap_or(H::INCOMPATIBLE);
        }
        (_, TypeRef::Multi(parts)) => {
            if parts.is_empty() {
                return H::INCOMPATIBLE;
            }
            let mut hints = H::SUCCESS;
            for part in parts {
                let part_hints = conformance_at(env, expected, part, depth);
                if !part_hints.is_success() {
                    return H::INCOMPATIBLE;
                }
                hints |= part_hints;
            }
            return hints;
        }
        (TypeRef::Wildcard { upper, .. }, _) => {
            if upper.is_empty() {
                return conformance_at(env, &TypeRef::simple(wk.object), actual, depth);
            }
            let mut hints = H::SUCCESS;
            for bound in upper {
                let bound_hints = conformance_at(env, bound, actual, depth);
                if !bound_hints.is_success() {
                    return H::INCOMPATIBLE;
                }
                hints |= bound_hints;
            }
            return hints;
        }
        (_, TypeRef::Wildcard { upper, .. }) => {
            let bound = upper
                .first()
                .cloned()
                .unwrap_or_else(|| TypeRef::simple(wk.object));
            return conformance_at(env, expected, &bound, depth);
        }
        _ => {}
    }

    if expected.is_void(env) || actual.is_void(env) {
        return H::INCOMPATIBLE;
    }

    match (expected.primitive(env), actual.primitive(env)) {
        (Some(e), Some(a)) => {
            return if e == a {
                H::SUCCESS
            } else if a.widens_to(e) {
                H::SUCCESS | H::WIDENING
            } else {
                H::INCOMPATIBLE
            };
        }
        (None, Some(a)) => {
            let boxed = TypeRef::simple(wk.wrapper(a));
            let hints = conformance_at(env, expected, &boxed, depth);
            return if hints.is_success() {
                hints | H::BOXING
            } else {
                H::INCOMPATIBLE
            };
        }
        (Some(e), None) => {
            let Some(a) = actual.type_id().and_then(|id| wk.unboxed(id)) else {
                return H::INCOMPATIBLE;
            };
            return if a == e {
                H::SUCCESS | H::UNBOXING
            } else if a.widens_to(e) {
                H::SUCCESS | H::UNBOXING | H::WIDENING
            } else {
                H::INCOMPATIBLE
            };
        }
        (None, None) => {}
    }

    match (expected, actual) {
        (
            TypeRef::Function {
                params: expected_params,
                ret: expected_ret,
            },
            TypeRef::Function {
                params: actual_params,
                ret: actual_ret,
            },
        ) => {
            if expected_params.len() != actual_params.len() {
                return H::INCOMPATIBLE;
            }
            // Parameters are contravariant.
            for (e, a) in expected_params.iter().zip(actual_params) {
                if !conformance_at(env, a, e, depth).is_success() {
                    return H::INCOMPATIBLE;
                }
            }
            if expected_ret.is_void(env) {
                return H::SUCCESS;
            }
            return if conformance_at(env, expected_ret, actual_ret, depth).is_success() {
                H::SUCCESS
            } else {
                H::INCOMPATIBLE
            };
        }
        (_, TypeRef::Function { params, ret }) => {
            if expected.is_type(wk.object) {
                return H::SUCCESS | H::SUBTYPE;
            }
            return match function_equivalent(env, params, ret) {
                Some(equivalent) => conformance_at(env, expected, &equivalent, depth),
                None => H::INCOMPATIBLE,
            };
        }
        (TypeRef::Function { .. }, _) => return H::INCOMPATIBLE,
        (TypeRef::Array(e), TypeRef::Array(a)) => {
            if e.primitive(env).is_some() || a.primitive(env).is_some() {
                return H::INCOMPATIBLE;
            }
            let hints = conformance_at(env, e, a, depth);
            return if hints.is_success() {
                hints
            } else {
                H::INCOMPATIBLE
            };
        }
        (_, TypeRef::Array(_)) => {
            return if expected.is_type(wk.object) {
                H::SUCCESS | H::SUBTYPE
            } else {
                H::INCOMPATIBLE
            };
        }
        (TypeRef::Array(_), _) => return H::INCOMPATIBLE,
        _ => {}
    }

    let Some(expected_id) = expected.type_id() else {
        return H::INCOMPATIBLE;
    };

    if expected.is_type_parameter(env) {
        if actual.is_type_parameter(env) && instantiate_as_supertype(env, actual, expected_id).is_some()
        {
            return H::SUCCESS | H::SUBTYPE;
        }
        // A free type parameter accepts whatever conforms to its erasure.
        let hints = conformance_at(env, &erasure(env, expected), actual, depth);
        return if hints.is_success() {
            hints | H::UNCHECKED
        } else {
            H::INCOMPATIBLE
        };
    }

    let Some(view) = instantiate_as_supertype(env, actual, expected_id) else {
        return H::INCOMPATIBLE;
    };
    let mut hints = H::SUCCESS;
    if actual.type_id() != Some(expected_id) {
        hints |= H::SUBTYPE;
    }

    let expected_args = expected.args();
    let view_args = view.args();
    if expected_args.is_empty() {
        return hints;
    }
    if view_args.is_empty() {
        return hints | H::UNCHECKED | H::RAW_TYPE;
    }
    if expected_args.len() != view_args.len() {
        return H::INCOMPATIBLE;
    }
    for (formal, arg) in expected_args.iter().zip(view_args) {
        if !argument_contains(env, formal, arg, depth) {
            return H::INCOMPATIBLE;
        }
    }
    hints
}

/// Type argument containment (JLS 4.5.1).
fn argument_contains(env: &dyn TypeEnv, formal: &TypeRef, actual: &TypeRef, depth: usize) -> bool {
    let object = TypeRef::simple(env.well_known().object);
    let actual = actual.resolved();
    match formal.resolved() {
        TypeRef::Wildcard {
            lower: Some(lower), ..
        } => {
            let actual_lower = match actual {
                TypeRef::Wildcard {
                    lower: Some(actual_lower),
                    ..
                } => actual_lower.as_ref(),
                TypeRef::Wildcard { .. } => return false,
                other => other,
            };
            conformance_at(env, actual_lower, lower, depth).is_success()
        }
        TypeRef::Wildcard { upper, .. } => {
            let actual_upper = match actual {
                TypeRef::Wildcard { upper, .. } => upper.first().unwrap_or(&object),
                other => other,
            };
            upper
                .iter()
                .all(|bound| conformance_at(env, bound, actual_upper, depth).is_success())
        }
        TypeRef::Any => true,
        other => matches!(actual, TypeRef::Any) || identifier(env, other) == identifier(env, actual),
    }
}

/// The most specific type every entry of `types` conforms to.
///
/// `null` entries are ignored unless nothing else is present. Primitive types join to the
/// widest of them when one exists, otherwise they are boxed. Classes are preferred over
/// interfaces when several unrelated common supertypes exist.
pub fn common_super_type(env: &dyn TypeEnv, types: &[TypeRef]) -> Option<TypeRef> {
    let wk = env.well_known();

    let mut flat: Vec<TypeRef> = Vec::with_capacity(types.len());
    for ty in types {
        match ty.resolved() {
            TypeRef::Multi(parts) => {
                for part in parts {
                    push_unique(&mut flat, part.resolved().clone());
                }
            }
            other => push_unique(&mut flat, other.clone()),
        }
    }

    let has_null = flat.contains(&TypeRef::Any);
    let values: Vec<TypeRef> = flat.iter().filter(|t| **t != TypeRef::Any).cloned().collect();
    if values.is_empty() {
        return flat.into_iter().next();
    }
    if values.len() == 1 {
        let only = &values[0];
        return Some(if has_null { only.boxed(env) } else { only.clone() });
    }

    if !has_null && values.iter().all(|t| t.primitive(env).is_some()) {
        let widest = values
            .iter()
            .find(|candidate| values.iter().all(|t| is_conformant(env, candidate, t)));
        if let Some(widest) = widest {
            return Some(widest.clone());
        }
    }

    let mut boxed: Vec<TypeRef> = Vec::with_capacity(values.len());
    for ty in &values {
        let ty = match ty {
            TypeRef::Function { params, ret } => function_equivalent(env, params, ret)
                .unwrap_or_else(|| TypeRef::simple(wk.object)),
            other => other.boxed(env),
        };
        push_unique(&mut boxed, ty);
    }
    if boxed.len() == 1 {
        return boxed.pop();
    }

    if boxed.iter().all(|t| matches!(t, TypeRef::Array(_))) {
        let components: Vec<TypeRef> = boxed
            .iter()
            .filter_map(|t| match t {
                TypeRef::Array(component) => Some((**component).clone()),
                _ => None,
            })
            .collect();
        if components.iter().all(|c| c.primitive(env).is_none()) {
            if let Some(component) = common_super_type(env, &components) {
                return Some(TypeRef::array(component));
            }
        }
        return Some(TypeRef::simple(wk.object));
    }

    let first = &boxed[0];
    let mut candidates = vec![first.clone()];
    candidates.extend(all_super_types(env, first));

    let mut common: Vec<TypeRef> = Vec::new();
    'candidates: for candidate in candidates {
        let Some(id) = candidate.type_id() else {
            continue;
        };
        let mut views = Vec::with_capacity(boxed.len());
        for ty in &boxed {
            match instantiate_as_supertype(env, ty, id) {
                Some(view) => views.push(view),
                None => continue 'candidates,
            }
        }
        common.push(merge_views(id, &views));
    }

    let minimal: Vec<&TypeRef> = common
        .iter()
        .filter(|c| {
            !common.iter().any(|d| match (d.type_id(), c.type_id()) {
                (Some(d), Some(c)) => d != c && is_subtype_of(env, d, c),
                _ => false,
            })
        })
        .collect();

    fn is_class(env: &dyn TypeEnv, ty: &TypeRef) -> bool {
        ty.type_id()
            .and_then(|id| env.type_def(id))
            .is_some_and(|def| def.kind == TypeKind::Class)
    }
    minimal
        .iter()
        .find(|c| is_class(env, c))
        .or_else(|| minimal.first())
        .map(|c| (*c).clone())
        .or_else(|| Some(TypeRef::simple(wk.object)))
}

fn push_unique(out: &mut Vec<TypeRef>, ty: TypeRef) {
    if !out.contains(&ty) {
        out.push(ty);
    }
}

/// Joins several instantiations of the same declared type: agreeing arguments are kept,
/// disagreeing ones become `?`.
fn merge_views(id: TypeId, views: &[TypeRef]) -> TypeRef {
    let Some(first) = views.first() else {
        return TypeRef::simple(id);
    };
    if views.iter().all(|v| v == first) {
        return first.clone();
    }
    if views.iter().any(|v| v.args().is_empty()) {
        return TypeRef::simple(id);
    }
    let args = first
        .args()
        .iter()
        .enumerate()
        .map(|(idx, arg)| {
            if views.iter().all(|v| v.args().get(idx) == Some(arg)) {
                arg.clone()
            } else {
                TypeRef::unbounded_wildcard()
            }
        })
        .collect();
    TypeRef::class(id, args)
}

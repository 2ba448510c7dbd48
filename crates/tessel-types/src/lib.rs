//! Type references and the declared-type store used by the Tessel inference engine.
//!
//! A [`TypeRef`] is a closed sum over every reference kind the engine produces. References are
//! context free: the substitution environment of a generic reference is supplied explicitly (see
//! [`declaring_type_mapping`] and [`substitute`]) instead of being attached to the reference.

mod conformance;
mod function;
mod serialize;
mod store;
mod subst;
mod supertypes;

use std::fmt;

pub use conformance::{common_super_type, conformance, is_conformant, ConformanceHints};
pub use function::function_equivalent;
pub use serialize::{serialize, SerializeError, SerializeOptions};
pub use store::{PrimitiveType, TypeDef, TypeEnv, TypeKind, TypeStore, WellKnownTypes};
pub use subst::{
    declaring_type_mapping, erase_undeclared, erasure, infer_type_args, substitute,
    type_params_in, Substitution,
};
pub use supertypes::{all_super_types, direct_super_types, instantiate_as_supertype, is_subtype_of};

/// Stable handle of a [`TypeDef`] inside a [`TypeStore`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A declared type with its arguments: `List<String>`, `String`, or a type parameter `T`
    /// (type parameters never carry arguments).
    Parameterized { ty: TypeId, args: Vec<TypeRef> },
    Array(Box<TypeRef>),
    /// `?`, `? extends A & B` or `? super L`.
    Wildcard {
        upper: Vec<TypeRef>,
        lower: Option<Box<TypeRef>>,
    },
    /// The type of `null`; conforms to every reference type.
    Any,
    /// A join of several candidates, collapsed to their common supertype on demand.
    Multi(Vec<TypeRef>),
    /// A transparent alias for another reference.
    Delegate(Box<TypeRef>),
    /// The type of a closure.
    Function {
        params: Vec<TypeRef>,
        ret: Box<TypeRef>,
    },
}

impl TypeRef {
    pub fn class(ty: TypeId, args: Vec<TypeRef>) -> Self {
        TypeRef::Parameterized { ty, args }
    }

    pub fn simple(ty: TypeId) -> Self {
        TypeRef::Parameterized {
            ty,
            args: Vec::new(),
        }
    }

    pub fn array(component: TypeRef) -> Self {
        TypeRef::Array(Box::new(component))
    }

    pub fn unbounded_wildcard() -> Self {
        TypeRef::Wildcard {
            upper: Vec::new(),
            lower: None,
        }
    }

    pub fn wildcard_extends(bound: TypeRef) -> Self {
        TypeRef::Wildcard {
            upper: vec![bound],
            lower: None,
        }
    }

    pub fn wildcard_super(bound: TypeRef) -> Self {
        TypeRef::Wildcard {
            upper: Vec::new(),
            lower: Some(Box::new(bound)),
        }
    }

    pub fn function(params: Vec<TypeRef>, ret: TypeRef) -> Self {
        TypeRef::Function {
            params,
            ret: Box::new(ret),
        }
    }

    /// Strips any number of [`TypeRef::Delegate`] layers.
    #[must_use]
    pub fn resolved(&self) -> &TypeRef {
        let mut current = self;
        while let TypeRef::Delegate(inner) = current {
            current = inner;
        }
        current
    }

    /// The declared type of a parameterized reference.
    #[must_use]
    pub fn type_id(&self) -> Option<TypeId> {
        match self.resolved() {
            TypeRef::Parameterized { ty, .. } => Some(*ty),
            _ => None,
        }
    }

    #[must_use]
    pub fn args(&self) -> &[TypeRef] {
        match self.resolved() {
            TypeRef::Parameterized { args, .. } => args,
            _ => &[],
        }
    }

    pub fn is_type(&self, id: TypeId) -> bool {
        self.type_id() == Some(id)
    }

    pub fn primitive(&self, env: &dyn TypeEnv) -> Option<PrimitiveType> {
        let def = env.type_def(self.type_id()?)?;
        match def.kind {
            TypeKind::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_void(&self, env: &dyn TypeEnv) -> bool {
        self.is_type(env.well_known().void)
    }

    pub fn is_type_parameter(&self, env: &dyn TypeEnv) -> bool {
        self.type_id()
            .and_then(|id| env.type_def(id))
            .is_some_and(|def| def.kind == TypeKind::TypeParameter)
    }

    /// Primitive references are replaced by their wrapper class.
    pub fn boxed(&self, env: &dyn TypeEnv) -> TypeRef {
        match self.primitive(env) {
            Some(p) => TypeRef::simple(env.well_known().wrapper(p)),
            None => self.clone(),
        }
    }

    /// Simple-name rendering for diagnostics: `List<String>`, `? extends T`, `(int)=>String`.
    pub fn display<'a>(&'a self, env: &'a dyn TypeEnv) -> DisplayType<'a> {
        DisplayType { env, ty: self }
    }
}

pub struct DisplayType<'a> {
    env: &'a dyn TypeEnv,
    ty: &'a TypeRef,
}

impl fmt::Display for DisplayType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type(self.env, self.ty, false, f)
    }
}

/// Fully qualified, whitespace-free rendering used for structural comparisons (override
/// detection, type argument containment).
pub fn identifier(env: &dyn TypeEnv, ty: &TypeRef) -> String {
    struct Identifier<'a>(&'a dyn TypeEnv, &'a TypeRef);

    impl fmt::Display for Identifier<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write_type(self.0, self.1, true, f)
        }
    }

    Identifier(env, ty).to_string()
}

fn write_type(
    env: &dyn TypeEnv,
    ty: &TypeRef,
    qualified: bool,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    let sep = if qualified { "," } else { ", " };
    match ty {
        TypeRef::Parameterized { ty, args } => {
            match env.type_def(*ty) {
                Some(def) if qualified => f.write_str(&def.name)?,
                Some(def) => f.write_str(def.simple_name())?,
                None => write!(f, "<unknown {ty:?}>")?,
            }
            if !args.is_empty() {
                f.write_str("<")?;
                for (idx, arg) in args.iter().enumerate() {
                    if idx != 0 {
                        f.write_str(sep)?;
                    }
                    write_type(env, arg, qualified, f)?;
                }
                f.write_str(">")?;
            }
            Ok(())
        }
        TypeRef::Array(component) => {
            write_type(env, component, qualified, f)?;
            f.write_str("[]")
        }
        TypeRef::Wildcard { upper, lower } => {
            f.write_str("?")?;
            if let Some(lower) = lower {
                f.write_str(" super ")?;
                return write_type(env, lower, qualified, f);
            }
            for (idx, bound) in upper.iter().enumerate() {
                f.write_str(if idx == 0 { " extends " } else { " & " })?;
                write_type(env, bound, qualified, f)?;
            }
            Ok(())
        }
        TypeRef::Any => f.write_str("null"),
        TypeRef::Multi(parts) => {
            for (idx, part) in parts.iter().enumerate() {
                if idx != 0 {
                    f.write_str(" | ")?;
                }
                write_type(env, part, qualified, f)?;
            }
            Ok(())
        }
        TypeRef::Delegate(inner) => write_type(env, inner, qualified, f),
        TypeRef::Function { params, ret } => {
            f.write_str("(")?;
            for (idx, param) in params.iter().enumerate() {
                if idx != 0 {
                    f.write_str(sep)?;
                }
                write_type(env, param, qualified, f)?;
            }
            f.write_str(")=>")?;
            write_type(env, ret, qualified, f)
        }
    }
}

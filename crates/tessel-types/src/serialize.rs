//! Java source rendering of type references, as consumed by code generation.

use crate::{common_super_type, function_equivalent, TypeEnv, TypeId, TypeKind, TypeRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Render wildcards as their bound and an unbounded `?` as `Object`.
    pub without_constraints: bool,
    /// Type parameters not declared in the context render as `?`.
    pub params_to_wildcard: bool,
    /// Type parameters not declared in the context render as `Object`.
    pub params_to_object: bool,
    /// Top-level primitives are printed as such; nested positions always box.
    pub allow_primitives: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            without_constraints: false,
            params_to_wildcard: false,
            params_to_object: false,
            allow_primitives: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SerializeError {
    #[error("a wildcard with several upper bounds cannot be printed without constraints")]
    MultipleUpperBounds,
    #[error("type parameter `{name}` cannot be replaced without a declaration context")]
    MissingContext { name: String },
    #[error("closure type with {arity} parameters has no functional interface equivalent")]
    NoFunctionEquivalent { arity: usize },
    #[error("type {0:?} is not defined")]
    UnknownType(TypeId),
}

/// Renders `ty` as Java source.
///
/// `context` lists the type parameters declared at the output position; it is only consulted
/// when one of the parameter replacement options is set.
pub fn serialize(
    env: &dyn TypeEnv,
    ty: &TypeRef,
    context: Option<&[TypeId]>,
    options: SerializeOptions,
) -> Result<String, SerializeError> {
    let mut out = String::new();
    Serializer {
        env,
        context,
        options,
    }
    .write(&mut out, ty, options.allow_primitives)?;
    Ok(out)
}

struct Serializer<'a> {
    env: &'a dyn TypeEnv,
    context: Option<&'a [TypeId]>,
    options: SerializeOptions,
}

impl Serializer<'_> {
    fn write(&self, out: &mut String, ty: &TypeRef, allow_primitives: bool) -> Result<(), SerializeError> {
        let env = self.env;
        let options = self.options;
        match ty {
            TypeRef::Wildcard { upper, lower } => {
                if !options.without_constraints {
                    out.push('?');
                }
                if let Some(lower) = lower {
                    if !options.without_constraints {
                        out.push_str(" super ");
                    }
                    return self.write(out, lower, false);
                }
                if upper.len() > 1 && options.without_constraints {
                    return Err(SerializeError::MultipleUpperBounds);
                }
                for (idx, bound) in upper.iter().enumerate() {
                    if idx == 0 {
                        if !options.without_constraints {
                            out.push_str(" extends ");
                        }
                    } else {
                        out.push_str(" & ");
                    }
                    self.write(out, bound, false)?;
                }
                if upper.is_empty() && options.without_constraints {
                    out.push_str(self.object_name());
                }
                Ok(())
            }
            TypeRef::Array(component) => {
                self.write(out, component, true)?;
                out.push_str("[]");
                Ok(())
            }
            TypeRef::Parameterized { ty: id, args } => {
                let def = env.type_def(*id).ok_or(SerializeError::UnknownType(*id))?;
                if def.kind == TypeKind::TypeParameter
                    && (options.params_to_wildcard || options.params_to_object)
                {
                    let context = self.context.ok_or_else(|| SerializeError::MissingContext {
                        name: def.name.clone(),
                    })?;
                    if !context.contains(id) {
                        if options.params_to_wildcard {
                            out.push('?');
                        } else {
                            out.push_str(self.object_name());
                        }
                        return Ok(());
                    }
                }

                match def.kind {
                    TypeKind::Primitive(p) if !allow_primitives => {
                        out.push_str(p.wrapper_name());
                    }
                    _ => out.push_str(&def.name),
                }
                if !args.is_empty() {
                    out.push('<');
                    for (idx, arg) in args.iter().enumerate() {
                        if idx != 0 {
                            out.push(',');
                        }
                        self.write(out, arg, false)?;
                    }
                    out.push('>');
                }
                Ok(())
            }
            TypeRef::Any => {
                out.push_str(self.object_name());
                Ok(())
            }
            TypeRef::Multi(_) => {
                let joined = common_super_type(env, std::slice::from_ref(ty))
                    .unwrap_or_else(|| TypeRef::simple(env.well_known().object));
                self.write(out, &joined, allow_primitives)
            }
            TypeRef::Delegate(inner) => self.write(out, inner, allow_primitives),
            TypeRef::Function { params, ret } => {
                let equivalent = function_equivalent(env, params, ret).ok_or(
                    SerializeError::NoFunctionEquivalent {
                        arity: params.len(),
                    },
                )?;
                self.write(out, &equivalent, allow_primitives)
            }
        }
    }

    fn object_name(&self) -> &str {
        let object = self.env.well_known().object;
        self.env
            .type_def(object)
            .map(|def| def.name.as_str())
            .unwrap_or("java.lang.Object")
    }
}

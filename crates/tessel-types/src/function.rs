use crate::{TypeEnv, TypeRef};

/// The JDK functional interface a closure type stands for, if one exists for its arity.
///
/// Primitive parameter and return types are boxed. `void` closures map to `Runnable` and
/// `Consumer`; value closures map to `Supplier`, `Function` and `BiFunction`.
pub fn function_equivalent(env: &dyn TypeEnv, params: &[TypeRef], ret: &TypeRef) -> Option<TypeRef> {
    let wk = env.well_known();
    let mut args: Vec<TypeRef> = params.iter().map(|p| p.boxed(env)).collect();
    if ret.is_void(env) {
        return match args.len() {
            0 => Some(TypeRef::simple(wk.runnable)),
            1 => Some(TypeRef::class(wk.consumer, args)),
            _ => None,
        };
    }

    let target = match args.len() {
        0 => wk.supplier,
        1 => wk.function,
        2 => wk.bi_function,
        _ => return None,
    };
    args.push(ret.boxed(env));
    Some(TypeRef::class(target, args))
}

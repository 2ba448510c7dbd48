use pretty_assertions::assert_eq;
use tessel_types::{common_super_type, is_conformant, TypeEnv, TypeRef, TypeStore};

#[test]
fn identical_types_join_to_themselves() {
    let env = TypeStore::with_minimal_jdk();
    let string = TypeRef::simple(env.well_known().string);
    assert_eq!(
        common_super_type(&env, &[string.clone(), string.clone()]),
        Some(string)
    );
}

#[test]
fn lists_with_different_elements_join_with_wildcard() {
    let env = TypeStore::with_minimal_jdk();
    let wk = env.well_known();
    let strings = TypeRef::class(wk.array_list, vec![TypeRef::simple(wk.string)]);
    let integers = TypeRef::class(wk.list, vec![TypeRef::simple(wk.integer)]);

    let joined = common_super_type(&env, &[strings.clone(), integers.clone()])
        .expect("lists always have a common supertype");
    assert_eq!(joined, TypeRef::class(wk.list, vec![TypeRef::unbounded_wildcard()]));
    assert!(is_conformant(&env, &joined, &strings));
    assert!(is_conformant(&env, &joined, &integers));
}

#[test]
fn arrays_join_component_wise() {
    let env = TypeStore::with_minimal_jdk();
    let wk = env.well_known();
    let ints = TypeRef::array(TypeRef::simple(wk.integer));
    let longs = TypeRef::array(TypeRef::simple(wk.long));
    assert_eq!(
        common_super_type(&env, &[ints, longs]),
        Some(TypeRef::array(TypeRef::simple(wk.number)))
    );

    let prim = TypeRef::array(TypeRef::simple(wk.prim_int));
    let boxed = TypeRef::array(TypeRef::simple(wk.integer));
    assert_eq!(
        common_super_type(&env, &[prim, boxed]),
        Some(TypeRef::simple(wk.object))
    );
}

#[test]
fn only_nulls_stay_null() {
    let env = TypeStore::with_minimal_jdk();
    assert_eq!(
        common_super_type(&env, &[TypeRef::Any, TypeRef::Any]),
        Some(TypeRef::Any)
    );
    assert_eq!(common_super_type(&env, &[]), None);
}

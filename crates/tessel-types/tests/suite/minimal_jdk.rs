use pretty_assertions::assert_eq;
use tessel_types::{
    all_super_types, instantiate_as_supertype, is_subtype_of, TypeEnv, TypeKind, TypeRef,
    TypeStore,
};

#[test]
fn minimal_jdk_interfaces_are_subtypes_of_object() {
    let env = TypeStore::with_minimal_jdk();
    let wk = env.well_known();

    for iface in [wk.char_sequence, wk.iterable, wk.list, wk.runnable, wk.function] {
        assert!(
            is_subtype_of(&env, iface, wk.object),
            "{} should be a subtype of Object",
            env.type_def(iface).map(|d| d.name.as_str()).unwrap_or("?")
        );
    }
}

#[test]
fn lookup_by_qualified_name() {
    let env = TypeStore::with_minimal_jdk();
    let list = env.lookup("java.util.List").expect("List must exist in minimal JDK");
    assert_eq!(list, env.well_known().list);
    assert_eq!(env.type_def(list).map(|d| d.kind), Some(TypeKind::Interface));
    assert_eq!(env.lookup("List"), None);
}

#[test]
fn big_numbers_are_numbers() {
    let env = TypeStore::with_minimal_jdk();
    let wk = env.well_known();
    assert!(is_subtype_of(&env, wk.big_integer, wk.number));
    assert!(is_subtype_of(&env, wk.big_decimal, wk.number));
    assert!(!is_subtype_of(&env, wk.number, wk.big_integer));
}

#[test]
fn user_generic_class_substitutes_through_hierarchy() {
    let mut env = TypeStore::with_minimal_jdk();
    let wk = env.well_known().clone();

    // class Box<X> implements Iterable<X> {}
    let x = env.add_type_param("X", Vec::new());
    let mut def = tessel_types::TypeDef::new("demo.Box", TypeKind::Class);
    def.type_params = vec![x];
    def.super_class = Some(TypeRef::simple(wk.object));
    def.interfaces = vec![TypeRef::class(wk.iterable, vec![TypeRef::simple(x)])];
    let box_id = env.add_type(def);

    let box_of_long = TypeRef::class(box_id, vec![TypeRef::simple(wk.long)]);
    assert_eq!(
        instantiate_as_supertype(&env, &box_of_long, wk.iterable),
        Some(TypeRef::class(wk.iterable, vec![TypeRef::simple(wk.long)]))
    );

    let supers: Vec<String> = all_super_types(&env, &box_of_long)
        .iter()
        .map(|t| t.display(&env).to_string())
        .collect();
    assert_eq!(supers, vec!["Object", "Iterable<Long>"]);
}

use pretty_assertions::assert_eq;
use tessel_model::{ElementKind, Model};
use tessel_types::{TypeEnv, TypeRef};

fn member_names(model: &Model, ty: tessel_types::TypeId) -> Vec<String> {
    let element = model.type_element(ty).expect("JDK type is declared");
    model
        .members(element)
        .iter()
        .map(|m| model.element(*m).name.to_string())
        .collect()
}

#[test]
fn string_declares_overloads_in_order() {
    let model = Model::with_minimal_jdk();
    let names = member_names(&model, model.well_known().string);
    assert_eq!(
        names.iter().filter(|n| n.as_str() == "substring").count(),
        2
    );
    assert!(names.contains(&"valueOf".to_string()));
}

#[test]
fn generic_members_mention_declared_type_parameters() {
    let model = Model::with_minimal_jdk();
    let wk = model.well_known();
    let list = model.type_element(wk.list).unwrap();
    let get = model
        .members(list)
        .iter()
        .copied()
        .find(|m| model.element(*m).name == "get")
        .unwrap();
    let e = model.type_def(wk.list).unwrap().type_params[0];
    assert_eq!(model.declared_type(get), Some(TypeRef::simple(e)));
    assert_eq!(model.param_types(get), vec![TypeRef::simple(wk.prim_int)]);
}

#[test]
fn constructors_belong_to_their_type() {
    let model = Model::with_minimal_jdk();
    let wk = model.well_known();
    let array_list = model.type_element(wk.array_list).unwrap();
    let ctors: Vec<_> = model
        .members(array_list)
        .iter()
        .copied()
        .filter(|m| matches!(model.element(*m).kind, ElementKind::Constructor(_)))
        .collect();
    assert_eq!(ctors.len(), 2);
    for ctor in ctors {
        assert_eq!(model.declaring_type(ctor), Some(wk.array_list));
    }
}

#[test]
fn sam_of_inherited_interface() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let mut def = tessel_types::TypeDef::new("demo.StringFunction", tessel_types::TypeKind::Interface);
    def.interfaces.push(TypeRef::class(
        wk.function,
        vec![TypeRef::simple(wk.string), TypeRef::simple(wk.string)],
    ));
    let id = model.types_mut().add_type(def);
    model.declare_type(id);

    let sam = model.single_abstract_method(id).expect("apply is inherited");
    assert_eq!(model.element(sam).name, "apply");
    assert_eq!(model.declaring_type(sam), Some(wk.function));
}

use std::cell::RefCell;

use pretty_assertions::assert_eq;
use tessel_core::Diagnostic;
use tessel_infer::{find_overridden_operation, NoDiagnostics, TypeResolver};
use tessel_model::{DeclaredType, ElementId, FieldDecl, Model, OperationDecl, Visibility};
use tessel_types::{TypeDef, TypeId, TypeKind, TypeRef};

fn class(model: &mut Model, name: &str, super_class: TypeRef) -> (ElementId, TypeId) {
    let mut def = TypeDef::new(name, TypeKind::Class);
    def.super_class = Some(super_class);
    let element = model.add_type(def);
    let id = model.as_type_element(element).expect("type element").id;
    (element, id)
}

#[test]
fn inferred_members_are_computed_when_first_used() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let (labels, _) = class(&mut model, "demo.Labels", TypeRef::simple(wk.object));

    // `size` reads `label()` before `label` is reached in declaration order.
    let label_call = model.call(None, "label", vec![]);
    let size_init = model.call(Some(label_call), "length", vec![]);
    let size = model.add_field(
        labels,
        FieldDecl::new("size", DeclaredType::Inferred).initializer(size_init),
    );
    let body = model.string("tessel");
    let label = model.add_operation(
        labels,
        OperationDecl::new("label", DeclaredType::Inferred).body(body),
    );

    let resolver = TypeResolver::new(&model);
    let sink = RefCell::<Vec<Diagnostic>>::default();
    let res = resolver.resolve_type(labels, &sink).unwrap();

    assert_eq!(model.resolved_type(label), Some(TypeRef::simple(wk.string)));
    assert_eq!(model.resolved_type(size), Some(TypeRef::simple(wk.prim_int)));
    assert_eq!(model.declared_type(size), Some(TypeRef::simple(wk.prim_int)));
    assert_eq!(res.element_type(label), Some(TypeRef::simple(wk.string)));
    assert_eq!(model.link(label_call), Some(label));
    assert!(sink.borrow().is_empty());
}

#[test]
fn mutually_recursive_inferred_operations_fall_back_to_object() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let (cycle, _) = class(&mut model, "demo.Cycle", TypeRef::simple(wk.object));
    let calls_g = model.call(None, "g", vec![]);
    let f = model.add_operation(
        cycle,
        OperationDecl::new("f", DeclaredType::Inferred).body(calls_g),
    );
    let calls_f = model.call(None, "f", vec![]);
    let g = model.add_operation(
        cycle,
        OperationDecl::new("g", DeclaredType::Inferred).body(calls_f),
    );

    let resolver = TypeResolver::new(&model);
    let sink = RefCell::<Vec<Diagnostic>>::default();
    resolver.resolve_type(cycle, &sink).unwrap();

    let object = TypeRef::simple(wk.object);
    assert_eq!(model.resolved_type(f), Some(object.clone()));
    assert_eq!(model.resolved_type(g), Some(object));
    assert_eq!(model.link(calls_g), Some(g));
    assert_eq!(model.link(calls_f), Some(f));
    assert!(sink.borrow().is_empty());
}

#[test]
fn mutually_dependent_field_initializers_fall_back_to_object() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let (pair, _) = class(&mut model, "demo.Pair", TypeRef::simple(wk.object));
    let reads_g = model.call(None, "g", vec![]);
    let f = model.add_field(
        pair,
        FieldDecl::new("f", DeclaredType::Inferred).initializer(reads_g),
    );
    let reads_f = model.call(None, "f", vec![]);
    let g = model.add_field(
        pair,
        FieldDecl::new("g", DeclaredType::Inferred).initializer(reads_f),
    );

    let resolver = TypeResolver::new(&model);
    let sink = RefCell::<Vec<Diagnostic>>::default();
    resolver.resolve_type(pair, &sink).unwrap();

    let object = TypeRef::simple(wk.object);
    assert_eq!(model.resolved_type(f), Some(object.clone()));
    assert_eq!(model.resolved_type(g), Some(object));
    assert_eq!(model.link(reads_g), Some(g));
    assert_eq!(model.link(reads_f), Some(f));
    assert!(sink.borrow().is_empty());
}

#[test]
fn inferred_members_of_other_types_are_computed_on_first_use() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let string = TypeRef::simple(wk.string);
    let (source, source_id) = class(&mut model, "demo.Source", TypeRef::simple(wk.object));
    let text = model.string("s");
    let y = model.add_field(
        source,
        FieldDecl::new("y", DeclaredType::Inferred).initializer(text),
    );
    let ctor = model.add_constructor(source, vec![], Visibility::Public);

    let (reader, _) = class(&mut model, "demo.Reader", TypeRef::simple(wk.object));
    let created = model.new_instance(TypeRef::simple(source_id), vec![]);
    let read = model.call(Some(created), "y", vec![]);
    let x = model.add_field(
        reader,
        FieldDecl::new("x", DeclaredType::Inferred).initializer(read),
    );

    let resolver = TypeResolver::new(&model);
    let sink = RefCell::<Vec<Diagnostic>>::default();
    let res = resolver.resolve_type(reader, &sink).unwrap();

    assert_eq!(model.resolved_type(x), Some(string.clone()));
    assert_eq!(model.resolved_type(y), Some(string.clone()));
    assert_eq!(res.actual_type(read), Some(string));
    assert_eq!(model.link(read), Some(y));
    assert_eq!(model.link(created), Some(ctor));
    assert!(sink.borrow().is_empty());
}

#[test]
fn overriding_an_inferred_operation_demands_its_return_type() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let string = TypeRef::simple(wk.string);
    let (base, base_id) = class(&mut model, "demo.Base", TypeRef::simple(wk.object));
    let base_body = model.string("s");
    let base_m = model.add_operation(
        base,
        OperationDecl::new("m", DeclaredType::Inferred).body(base_body),
    );
    let (sub, _) = class(&mut model, "demo.Sub", TypeRef::simple(base_id));
    let sub_body = model.null();
    let sub_m = model.add_operation(
        sub,
        OperationDecl::new("m", DeclaredType::Inferred).body(sub_body),
    );

    let resolver = TypeResolver::new(&model);
    let res = resolver.resolve_type(sub, &NoDiagnostics).unwrap();

    assert_eq!(model.resolved_type(base_m), Some(string.clone()));
    assert_eq!(model.resolved_type(sub_m), Some(string.clone()));
    assert_eq!(res.expected_type(sub_body), Some(string));
}

#[test]
fn overriding_operations_inherit_the_declared_return_type() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let (base, base_id) = class(&mut model, "demo.Base", TypeRef::simple(wk.object));
    let described = model.add_operation(
        base,
        OperationDecl::new(
            "describe",
            DeclaredType::Explicit(TypeRef::simple(wk.char_sequence)),
        ),
    );
    let (sub, _) = class(&mut model, "demo.Sub", TypeRef::simple(base_id));
    let body = model.string("sub");
    let describe = model.add_operation(
        sub,
        OperationDecl::new("describe", DeclaredType::Inferred).body(body),
    );

    let resolver = TypeResolver::new(&model);
    let res = resolver.resolve_type(sub, &NoDiagnostics).unwrap();

    assert_eq!(
        find_overridden_operation(&model, describe)
            .unwrap()
            .map(|o| o.operation),
        Some(described)
    );
    assert_eq!(
        model.resolved_type(describe),
        Some(TypeRef::simple(wk.char_sequence))
    );
    assert_eq!(res.return_type(body), Some(TypeRef::simple(wk.string)));
    assert_eq!(
        res.expected_type(body),
        Some(TypeRef::simple(wk.char_sequence))
    );
}

#[test]
fn field_assignments_link_through_the_implicit_this() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let (counter, _) = class(&mut model, "demo.Counter", TypeRef::simple(wk.object));
    let count = model.add_field(
        counter,
        FieldDecl::new("count", DeclaredType::Explicit(TypeRef::simple(wk.prim_int))),
    );
    let five = model.number("5");
    let assign = model.assign(None, "count", five);
    model.add_operation(
        counter,
        OperationDecl::new("reset", DeclaredType::Explicit(TypeRef::simple(wk.void))).body(assign),
    );
    let this = model.as_type_element(counter).expect("type element").this_local;

    let resolver = TypeResolver::new(&model);
    let sink = RefCell::<Vec<Diagnostic>>::default();
    let res = resolver.resolve_type(counter, &sink).unwrap();

    assert_eq!(model.link(assign), Some(count));
    assert_eq!(model.implicit_receiver(assign), Some(this));
    assert_eq!(res.actual_type(assign), Some(TypeRef::simple(wk.void)));
    assert_eq!(res.expected_type(five), Some(TypeRef::simple(wk.prim_int)));
    assert!(sink.borrow().is_empty());
}

#[test]
fn operation_bodies_see_their_parameters() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let (greeter, _) = class(&mut model, "demo.Greeter", TypeRef::simple(wk.object));
    let read = model.call(None, "name", vec![]);
    let suffix = model.string("!");
    let body = model.call(Some(read), "concat", vec![suffix]);
    let greet = model.add_operation(
        greeter,
        OperationDecl::new("greet", DeclaredType::Inferred)
            .param("name", TypeRef::simple(wk.string))
            .body(body),
    );

    let resolver = TypeResolver::new(&model);
    resolver.resolve_type(greeter, &NoDiagnostics).unwrap();

    assert_eq!(model.resolved_type(greet), Some(TypeRef::simple(wk.string)));
    assert_eq!(model.link(read), model.element(greet).params().first().copied());
}

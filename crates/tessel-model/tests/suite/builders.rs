use pretty_assertions::assert_eq;
use tessel_model::{
    DeclaredType, ElementKind, ExprKind, FeatureRef, FieldDecl, Model, OperationDecl, Visibility,
};
use tessel_types::{TypeDef, TypeKind, TypeRef};

#[test]
fn operations_allocate_parameters() {
    let mut model = Model::with_minimal_jdk();
    let string = TypeRef::simple(model.well_known().string);
    let foo = model.add_type(TypeDef::new("demo.Foo", TypeKind::Class));
    let body = model.string("x");
    let op = model.add_operation(
        foo,
        OperationDecl::new("greet", DeclaredType::Inferred)
            .param("name", string.clone())
            .body(body)
            .visibility(Visibility::Private),
    );

    let element = model.element(op);
    assert_eq!(element.visibility(), Visibility::Private);
    assert_eq!(element.params().len(), 1);
    assert_eq!(model.declared_type(element.params()[0]), Some(string));
    assert_eq!(model.members(foo), &[op]);
}

#[test]
fn calls_start_pending_unless_linked() {
    let mut model = Model::with_minimal_jdk();
    let foo = model.add_type(TypeDef::new("demo.Foo", TypeKind::Class));
    let field = model.add_field(foo, FieldDecl::new("count", DeclaredType::Inferred).static_());
    assert!(model.element(field).is_static());

    let pending = model.call(None, "count", Vec::new());
    let linked = model.linked_call(None, field, Vec::new());
    let feature = |id| match &model.expr(id).kind {
        ExprKind::FeatureCall(call) => call.feature,
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(feature(pending), FeatureRef::Pending);
    assert_eq!(feature(linked), FeatureRef::Resolved(field));
}

#[test]
fn write_back_slots_are_shared_through_immutable_borrows() {
    let mut model = Model::with_minimal_jdk();
    let foo = model.add_type(TypeDef::new("demo.Foo", TypeKind::Class));
    let field = model.add_field(foo, FieldDecl::new("x", DeclaredType::Inferred));
    let call = model.call(None, "x", Vec::new());
    let this_local = match &model.element(foo).kind {
        ElementKind::Type(ty) => ty.this_local,
        _ => unreachable!(),
    };

    let view = &model;
    view.set_link(call, field);
    view.set_implicit_receiver(call, this_local);
    assert_eq!(model.link(call), Some(field));
    assert_eq!(model.implicit_receiver(call), Some(this_local));
}

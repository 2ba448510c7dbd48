use std::cell::RefCell;

use pretty_assertions::assert_eq;
use tessel_config::InferenceConfig;
use tessel_core::{Diagnostic, Name, Span};
use tessel_infer::{CandidateKind, Link, LinkRecord, LinkingCandidate, NoDiagnostics, TypeResolver};
use tessel_model::{
    DeclaredType, ElementId, ExprKind, FeatureCall, FeatureRef, FieldDecl, Model, OperationDecl,
    Visibility,
};
use tessel_types::{TypeDef, TypeId, TypeKind, TypeRef};

fn operation(model: &Model, ty: TypeId, name: &str, params: &[TypeRef]) -> ElementId {
    let element = model.type_element(ty).expect("type is declared");
    model
        .members(element)
        .iter()
        .copied()
        .find(|m| model.element(*m).name == name && model.param_types(*m) == params)
        .expect("operation is declared")
}

/// Declares `name` as a class extending `Object`.
fn class(model: &mut Model, name: &str) -> (ElementId, TypeId) {
    let mut def = TypeDef::new(name, TypeKind::Class);
    def.super_class = Some(TypeRef::simple(model.well_known().object));
    let element = model.add_type(def);
    let id = model.as_type_element(element).expect("type element").id;
    (element, id)
}

fn diagnostics() -> RefCell<Vec<Diagnostic>> {
    RefCell::default()
}

#[test]
fn overloads_prefer_the_exact_primitive_match() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let receiver = model.type_literal(TypeRef::simple(wk.string));
    let one = model.number("1");
    let call = model.call(Some(receiver), "valueOf", vec![one]);

    let by_int = operation(&model, wk.string, "valueOf", &[TypeRef::simple(wk.prim_int)]);
    let by_object = operation(&model, wk.string, "valueOf", &[TypeRef::simple(wk.object)]);

    let resolver = TypeResolver::new(&model);
    let sink = diagnostics();
    let res = resolver.resolve_expression(call, None, None, &sink).unwrap();

    assert_eq!(model.link(call), Some(by_int));
    assert_eq!(res.actual_type(call), Some(TypeRef::simple(wk.string)));
    assert_eq!(res.actual_type(one), Some(TypeRef::simple(wk.prim_int)));
    assert!(sink.borrow().is_empty());

    let candidates = res.linking_candidates(call).unwrap();
    assert_eq!(candidates.len(), 2);
    assert!(candidates.iter().all(|c| c.applicable));
    assert!(candidates.iter().all(|c| c.kind == CandidateKind::Competing));
    assert_eq!(candidates[0].element, Some(by_int));
    assert!(candidates[0].selected);
    assert_eq!(candidates[1].element, Some(by_object));
    assert!(!candidates[1].selected);
    assert_eq!(
        candidates[0].feature_type,
        Some(TypeRef::simple(wk.string))
    );
}

#[test]
fn candidate_ranking_is_deterministic() {
    // Builds a fresh model each time, so no link is committed before ranking.
    fn rank() -> Vec<LinkingCandidate> {
        let mut model = Model::with_minimal_jdk();
        let wk = model.well_known().clone();
        let receiver = model.type_literal(TypeRef::simple(wk.string));
        let one = model.number("1");
        let call = model.call(Some(receiver), "valueOf", vec![one]);

        let resolver = TypeResolver::new(&model);
        let res = resolver
            .resolve_expression(call, None, None, &NoDiagnostics)
            .unwrap();
        let ranked = res.linking_candidates(call).unwrap();
        assert_eq!(res.linking_candidates(call).unwrap(), ranked);

        // A second pass over the linked model ranks the same way.
        let again = TypeResolver::new(&model)
            .resolve_expression(call, None, None, &NoDiagnostics)
            .unwrap()
            .linking_candidates(call)
            .unwrap();
        assert_eq!(again, ranked);

        assert_eq!(
            ranked.iter().map(|c| c.element).collect::<Vec<_>>(),
            vec![
                Some(operation(&model, wk.string, "valueOf", &[TypeRef::simple(wk.prim_int)])),
                Some(operation(&model, wk.string, "valueOf", &[TypeRef::simple(wk.object)])),
            ]
        );
        ranked
    }

    let first = rank();
    for _ in 0..4 {
        assert_eq!(rank(), first);
    }
}

#[test]
fn unresolvable_names_are_reported_once() {
    let mut model = Model::with_minimal_jdk();
    let span = Span::new(4, 14);
    let call = model.alloc_expr_at(
        ExprKind::FeatureCall(FeatureCall {
            receiver: None,
            name: Name::from("frobnicate"),
            args: vec![],
            type_args: vec![],
            feature: FeatureRef::Pending,
        }),
        span,
    );

    let resolver = TypeResolver::new(&model);
    let sink = diagnostics();
    let res = resolver.resolve_expression(call, None, None, &sink).unwrap();

    assert_eq!(model.link(call), None);
    assert_eq!(
        res.link(call),
        Some(Link::Unresolved {
            name: Name::from("frobnicate"),
            span,
        })
    );
    assert_eq!(res.actual_type(call), Some(TypeRef::Any));

    let diagnostics = sink.borrow();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, "unresolved-reference");
    assert_eq!(diagnostics[0].message, "`frobnicate` cannot be resolved");
    assert_eq!(diagnostics[0].span, Some(span));

    let candidates = res.linking_candidates(call).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].kind, CandidateKind::Unresolvable);
    assert_eq!(candidates[0].element, None);
}

#[test]
fn missing_members_of_a_known_receiver_are_unresolved() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let receiver = model.string("x");
    let call = model.call(Some(receiver), "frobnicate", vec![]);

    let resolver = TypeResolver::new(&model);
    let sink = diagnostics();
    let res = resolver.resolve_expression(call, None, None, &sink).unwrap();

    assert_eq!(res.actual_type(receiver), Some(TypeRef::simple(wk.string)));
    assert!(matches!(
        res.link(call),
        Some(Link::Unresolved { name, .. }) if name == "frobnicate"
    ));
    assert_eq!(model.link(call), None);

    let diagnostics = sink.borrow();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, "unresolved-reference");
    assert_eq!(diagnostics[0].message, "`frobnicate` cannot be resolved");
}

#[test]
fn diagnostics_can_be_switched_off() {
    let mut model = Model::with_minimal_jdk();
    let call = model.call(None, "frobnicate", vec![]);
    let config = InferenceConfig {
        diagnostics: false,
        ..InferenceConfig::default()
    };

    let resolver = TypeResolver::with_config(&model, config);
    let sink = diagnostics();
    let res = resolver.resolve_expression(call, None, None, &sink).unwrap();

    assert!(sink.borrow().is_empty());
    assert!(matches!(res.link(call), Some(Link::Unresolved { .. })));
}

#[test]
fn members_of_it_are_reachable_without_a_receiver() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let it = model.add_local("it", Some(TypeRef::simple(wk.string)), false);
    let init = model.string("tessel");
    let declare = model.declare(it, Some(init));
    let length = model.call(None, "length", vec![]);
    let block = model.block(vec![declare, length]);

    let resolver = TypeResolver::new(&model);
    let res = resolver
        .resolve_expression(block, None, None, &NoDiagnostics)
        .unwrap();

    let length_op = operation(&model, wk.string, "length", &[]);
    assert_eq!(
        res.link(length),
        Some(Link::Resolved(LinkRecord {
            element: length_op,
            implicit_receiver: Some(it),
            receiver_type: Some(TypeRef::simple(wk.string)),
        }))
    );
    assert_eq!(model.link(length), Some(length_op));
    assert_eq!(model.implicit_receiver(length), Some(it));
    assert_eq!(res.actual_type(block), Some(TypeRef::simple(wk.prim_int)));
}

#[test]
fn property_names_reach_getters_and_setters() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let string = TypeRef::simple(wk.string);
    let (person, _) = class(&mut model, "demo.Person");
    let getter = model.add_operation(
        person,
        OperationDecl::new("getName", DeclaredType::Explicit(string.clone())),
    );
    let setter = model.add_operation(
        person,
        OperationDecl::new("setName", DeclaredType::Explicit(TypeRef::simple(wk.void)))
            .param("name", string.clone()),
    );
    let this = model.as_type_element(person).expect("type element").this_local;

    let read = model.call(None, "name", vec![]);
    let value = model.string("Ada");
    let write = model.assign(None, "name", value);

    let resolver = TypeResolver::new(&model);
    let sink = diagnostics();
    let res = resolver
        .resolve_expression(read, Some(person), None, &sink)
        .unwrap();
    assert_eq!(model.link(read), Some(getter));
    assert_eq!(model.implicit_receiver(read), Some(this));
    assert_eq!(res.actual_type(read), Some(string.clone()));

    // An assignment has no value.
    let res = resolver
        .resolve_expression(write, Some(person), Some(TypeRef::simple(wk.void)), &sink)
        .unwrap();
    assert_eq!(model.link(write), Some(setter));
    assert_eq!(res.actual_type(value), Some(string.clone()));
    assert_eq!(res.expected_type(value), Some(string));
    assert!(sink.borrow().is_empty());
}

#[test]
fn diamond_constructor_calls_take_arguments_from_the_expectation() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let string = TypeRef::simple(wk.string);
    let with_expectation = model.new_instance(TypeRef::simple(wk.array_list), vec![]);
    let without = model.new_instance(TypeRef::simple(wk.array_list), vec![]);

    let resolver = TypeResolver::new(&model);
    let expected = TypeRef::class(wk.list, vec![string.clone()]);
    let res = resolver
        .resolve_expression(with_expectation, None, Some(expected), &NoDiagnostics)
        .unwrap();
    assert_eq!(
        res.actual_type(with_expectation),
        Some(TypeRef::class(wk.array_list, vec![string]))
    );
    let candidates = res.linking_candidates(with_expectation).unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].kind, CandidateKind::Unique);
    assert!(candidates[0].selected);
    assert!(!candidates[1].applicable);

    let res = resolver
        .resolve_expression(without, None, None, &NoDiagnostics)
        .unwrap();
    assert_eq!(
        res.actual_type(without),
        Some(TypeRef::class(wk.array_list, vec![TypeRef::simple(wk.object)]))
    );
}

#[test]
fn operation_type_arguments_are_inferred_from_arguments() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let string = TypeRef::simple(wk.string);
    let (lists_el, lists) = class(&mut model, "demo.Lists");
    let t = model.types_mut().add_type_param("T", Vec::new());
    model.add_operation(
        lists_el,
        OperationDecl::new("first", DeclaredType::Explicit(TypeRef::simple(t)))
            .type_param(t)
            .param("items", TypeRef::class(wk.list, vec![TypeRef::simple(t)]))
            .static_(),
    );

    let names = model.add_local(
        "names",
        Some(TypeRef::class(wk.list, vec![string.clone()])),
        false,
    );
    let declare = model.declare(names, None);
    let receiver = model.type_literal(TypeRef::simple(lists));
    let arg = model.call(None, "names", vec![]);
    let first = model.call(Some(receiver), "first", vec![arg]);
    let block = model.block(vec![declare, first]);

    let resolver = TypeResolver::new(&model);
    let res = resolver
        .resolve_expression(block, None, None, &NoDiagnostics)
        .unwrap();
    assert_eq!(res.actual_type(first), Some(string));
}

#[test]
fn closure_arguments_bind_the_remaining_type_arguments() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let (functions_el, functions) = class(&mut model, "demo.Functions");
    let t = model.types_mut().add_type_param("T", Vec::new());
    let r = model.types_mut().add_type_param("R", Vec::new());
    model.add_operation(
        functions_el,
        OperationDecl::new("map", DeclaredType::Explicit(TypeRef::simple(r)))
            .type_param(t)
            .type_param(r)
            .param("value", TypeRef::simple(t))
            .param(
                "fn",
                TypeRef::class(wk.function, vec![TypeRef::simple(t), TypeRef::simple(r)]),
            )
            .static_(),
    );

    let x = model.add_parameter("x", None);
    let read = model.call(None, "x", vec![]);
    let body = model.call(Some(read), "length", vec![]);
    let closure = model.closure(vec![x], body);
    let receiver = model.type_literal(TypeRef::simple(functions));
    let value = model.string("tessel");
    let call = model.call(Some(receiver), "map", vec![value, closure]);

    let resolver = TypeResolver::new(&model);
    let sink = diagnostics();
    let res = resolver.resolve_expression(call, None, None, &sink).unwrap();

    let string = TypeRef::simple(wk.string);
    let integer = TypeRef::simple(wk.integer);
    assert_eq!(res.element_type(x), Some(string.clone()));
    assert_eq!(res.return_type(body), Some(TypeRef::simple(wk.prim_int)));
    assert_eq!(
        res.actual_type(closure),
        Some(TypeRef::class(wk.function, vec![string, integer.clone()]))
    );
    assert_eq!(res.actual_type(call), Some(integer));
    assert!(sink.borrow().is_empty());
}

#[test]
fn static_members_cannot_use_the_implicit_this() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let (counter, _) = class(&mut model, "demo.Counter");
    model.add_operation(
        counter,
        OperationDecl::new("count", DeclaredType::Explicit(TypeRef::simple(wk.prim_int))),
    );
    let call = model.call(None, "count", vec![]);
    let make = model.add_operation(
        counter,
        OperationDecl::new("make", DeclaredType::Inferred)
            .body(call)
            .static_(),
    );

    let resolver = TypeResolver::new(&model);
    let sink = diagnostics();
    resolver.resolve_type(counter, &sink).unwrap();

    assert_eq!(model.link(call), None);
    assert_eq!(model.resolved_type(make), Some(TypeRef::simple(wk.object)));
    let diagnostics = sink.borrow();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message, "`count` cannot be resolved");
}

#[test]
fn private_members_are_visible_inside_their_type_only() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let (secret, secret_id) = class(&mut model, "demo.Secret");
    model.add_constructor(secret, Vec::new(), Visibility::Public);
    let code = model.add_field(
        secret,
        FieldDecl::new("code", DeclaredType::Explicit(TypeRef::simple(wk.prim_int)))
            .visibility(Visibility::Private),
    );

    let outside_new = model.new_instance(TypeRef::simple(secret_id), vec![]);
    let outside = model.call(Some(outside_new), "code", vec![]);
    let inside_new = model.new_instance(TypeRef::simple(secret_id), vec![]);
    let inside = model.call(Some(inside_new), "code", vec![]);

    let resolver = TypeResolver::new(&model);
    let res = resolver
        .resolve_expression(outside, None, None, &NoDiagnostics)
        .unwrap();
    assert_eq!(model.link(outside), None);
    assert_eq!(res.actual_type(outside_new), Some(TypeRef::simple(secret_id)));
    let candidates = res.linking_candidates(outside).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].element, Some(code));
    assert!(!candidates[0].applicable);

    let res = resolver
        .resolve_expression(inside, Some(secret), None, &NoDiagnostics)
        .unwrap();
    assert_eq!(model.link(inside), Some(code));
    assert_eq!(res.actual_type(inside), Some(TypeRef::simple(wk.prim_int)));
}

#[test]
fn prelinked_references_are_reported_as_already_resolved() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let length_op = operation(&model, wk.string, "length", &[]);
    let receiver = model.string("tessel");
    let call = model.linked_call(Some(receiver), length_op, vec![]);

    let resolver = TypeResolver::new(&model);
    let res = resolver
        .resolve_expression(call, None, None, &NoDiagnostics)
        .unwrap();
    assert_eq!(res.actual_type(call), Some(TypeRef::simple(wk.prim_int)));

    let candidates = res.linking_candidates(call).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].kind, CandidateKind::AlreadyResolved);
    assert_eq!(candidates[0].element, Some(length_op));
}

use std::cell::RefCell;

use pretty_assertions::assert_eq;
use tessel_core::Diagnostic;
use tessel_infer::{LiteralRepresentation, NoDiagnostics, TypeResolver};
use tessel_model::{ElementId, ExprKind, Model, Switch, SwitchCase};
use tessel_types::{ConformanceHints, TypeId, TypeRef};

fn operation(model: &Model, ty: TypeId, name: &str, params: &[TypeRef]) -> ElementId {
    let element = model.type_element(ty).expect("type is declared");
    model
        .members(element)
        .iter()
        .copied()
        .find(|m| model.element(*m).name == name && model.param_types(*m) == params)
        .expect("operation is declared")
}

#[test]
fn if_branches_join_under_a_number_expectation() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let condition = model.boolean(true);
    let one = model.number("1");
    let half = model.number("2.5");
    let expr = model.if_(condition, one, Some(half));

    let resolver = TypeResolver::new(&model);
    let res = resolver
        .resolve_expression(expr, None, Some(TypeRef::simple(wk.number)), &NoDiagnostics)
        .unwrap();

    assert_eq!(res.actual_type(one), Some(TypeRef::simple(wk.prim_int)));
    assert_eq!(res.actual_type(half), Some(TypeRef::simple(wk.prim_double)));
    assert_eq!(res.actual_type(expr), Some(TypeRef::simple(wk.prim_double)));
    assert_eq!(res.expected_type(one), Some(TypeRef::simple(wk.number)));
    assert_eq!(
        res.expected_type(condition),
        Some(TypeRef::simple(wk.prim_boolean))
    );

    let hints = res.conformance_hints(one);
    assert!(hints.is_success());
    assert!(hints.contains(ConformanceHints::BOXING));
    assert!(hints.contains(ConformanceHints::CHECKED));
}

#[test]
fn number_literals_follow_the_expectation() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let big = model.number("3");
    let plain = model.number("3");
    let hex = model.number("0x1F");
    let resolver = TypeResolver::new(&model);
    let big_integer = TypeRef::simple(wk.big_integer);

    let res = resolver
        .resolve_expression(big, None, Some(big_integer.clone()), &NoDiagnostics)
        .unwrap();
    assert_eq!(res.actual_type(big), Some(big_integer.clone()));
    assert_eq!(
        res.literal_representation(big),
        Some(LiteralRepresentation::BigInteger {
            digits: "3".into(),
            radix: 10
        })
    );

    let res = resolver
        .resolve_expression(plain, None, None, &NoDiagnostics)
        .unwrap();
    assert_eq!(res.actual_type(plain), Some(TypeRef::simple(wk.prim_int)));
    assert_eq!(
        res.literal_representation(plain),
        Some(LiteralRepresentation::Machine)
    );
    assert!(res
        .conformance_hints(plain)
        .contains(ConformanceHints::EXPECTATION_INDEPENDENT));

    let res = resolver
        .resolve_expression(hex, None, Some(big_integer), &NoDiagnostics)
        .unwrap();
    assert_eq!(
        res.literal_representation(hex),
        Some(LiteralRepresentation::BigInteger {
            digits: "1f".into(),
            radix: 16
        })
    );
}

#[test]
fn single_character_strings_become_chars_when_expected() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let single = model.string("a");
    let double = model.string("ab");
    let resolver = TypeResolver::new(&model);
    let char_ = TypeRef::simple(wk.prim_char);

    let res = resolver
        .resolve_expression(single, None, Some(char_.clone()), &NoDiagnostics)
        .unwrap();
    assert_eq!(res.actual_type(single), Some(char_.clone()));

    let sink = RefCell::<Vec<Diagnostic>>::default();
    let res = resolver
        .resolve_expression(double, None, Some(char_), &sink)
        .unwrap();
    assert_eq!(res.actual_type(double), Some(TypeRef::simple(wk.string)));
    assert!(res
        .conformance_hints(double)
        .contains(ConformanceHints::INCOMPATIBLE));

    let diagnostics = sink.borrow();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, "incompatible-types");
}

#[test]
fn block_locals_take_their_initializer_type() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let x = model.add_local("x", None, true);
    let init = model.number("1");
    let declare = model.declare(x, Some(init));
    let read = model.call(None, "x", vec![]);
    let block = model.block(vec![declare, read]);

    let resolver = TypeResolver::new(&model);
    let res = resolver
        .resolve_expression(block, None, None, &NoDiagnostics)
        .unwrap();

    let int = TypeRef::simple(wk.prim_int);
    assert_eq!(res.element_type(x), Some(int.clone()));
    assert_eq!(res.actual_type(read), Some(int.clone()));
    assert_eq!(res.actual_type(block), Some(int));
    assert_eq!(res.actual_type(declare), Some(TypeRef::simple(wk.void)));
    assert_eq!(model.link(read), Some(x));
}

#[test]
fn casts_and_type_literals() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let null = model.null();
    let cast = model.alloc_expr(ExprKind::Cast {
        target: TypeRef::simple(wk.string),
        expr: null,
    });
    let literal = model.type_literal(TypeRef::simple(wk.prim_int));
    let block = model.block(vec![cast, literal]);

    let resolver = TypeResolver::new(&model);
    let res = resolver
        .resolve_expression(block, None, None, &NoDiagnostics)
        .unwrap();

    assert_eq!(res.actual_type(cast), Some(TypeRef::simple(wk.string)));
    assert_eq!(res.actual_type(null), Some(TypeRef::Any));
    assert_eq!(
        res.actual_type(literal),
        Some(TypeRef::class(wk.class, vec![TypeRef::simple(wk.integer)]))
    );
}

#[test]
fn switch_type_guards_refine_the_discriminant_local() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let string = TypeRef::simple(wk.string);
    let v = model.add_local("v", Some(TypeRef::simple(wk.object)), true);
    let init = model.string("text");
    let declare = model.declare(v, Some(init));

    let discriminant = model.call(None, "v", vec![]);
    let guarded = model.call(None, "v", vec![]);
    let length = model.call(Some(guarded), "length", vec![]);
    let zero = model.number("0");
    let switch = model.alloc_expr(ExprKind::Switch(Switch {
        local: None,
        discriminant,
        cases: vec![SwitchCase {
            type_guard: Some(string.clone()),
            case: None,
            then: length,
        }],
        default: Some(zero),
    }));
    let block = model.block(vec![declare, switch]);

    let resolver = TypeResolver::new(&model);
    let res = resolver
        .resolve_expression(block, None, None, &NoDiagnostics)
        .unwrap();

    assert_eq!(res.actual_type(guarded), Some(string));
    assert_eq!(res.actual_type(switch), Some(TypeRef::simple(wk.prim_int)));
    assert_eq!(
        model.link(length),
        Some(operation(&model, wk.string, "length", &[]))
    );
    // The refinement does not leak out of the case.
    assert_eq!(res.element_type(v), Some(TypeRef::simple(wk.object)));
    assert_eq!(res.actual_type(discriminant), Some(TypeRef::simple(wk.object)));
}

#[test]
fn for_loops_bind_the_element_type() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let string = TypeRef::simple(wk.string);
    let names = model.add_local(
        "names",
        Some(TypeRef::class(wk.list, vec![string.clone()])),
        false,
    );
    let declare = model.declare(names, None);
    let name = model.add_parameter("name", None);
    let iterable = model.call(None, "names", vec![]);
    let read = model.call(None, "name", vec![]);
    let length = model.call(Some(read), "length", vec![]);
    let for_ = model.alloc_expr(ExprKind::For {
        param: name,
        iterable,
        body: length,
    });
    let block = model.block(vec![declare, for_]);

    let resolver = TypeResolver::new(&model);
    let res = resolver
        .resolve_expression(block, None, None, &NoDiagnostics)
        .unwrap();

    assert_eq!(res.element_type(name), Some(string));
    assert_eq!(res.actual_type(for_), Some(TypeRef::simple(wk.void)));
    assert_eq!(res.actual_type(length), Some(TypeRef::simple(wk.prim_int)));
    assert_eq!(
        model.link(length),
        Some(operation(&model, wk.string, "length", &[]))
    );
}

#[test]
fn repeated_passes_compute_equal_types() {
    let mut model = Model::with_minimal_jdk();
    let wk = model.well_known().clone();
    let word = model.add_local("word", None, true);
    let init = model.string("tessel");
    let declare = model.declare(word, Some(init));
    let read = model.call(None, "word", vec![]);
    let length = model.call(Some(read), "length", vec![]);
    let block = model.block(vec![declare, length]);

    let pass = |model: &Model| {
        let resolver = TypeResolver::new(model);
        let res = resolver
            .resolve_expression(block, None, None, &NoDiagnostics)
            .unwrap();
        [block, read, length].map(|e| res.actual_type(e))
    };
    let first = pass(&model);
    let second = pass(&model);

    assert_eq!(first, second);
    assert_eq!(first[0], Some(TypeRef::simple(wk.prim_int)));
    assert_eq!(first[1], Some(TypeRef::simple(wk.string)));
}

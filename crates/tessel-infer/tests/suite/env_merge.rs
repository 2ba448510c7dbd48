use std::collections::HashMap;

use proptest::prelude::*;
use tessel_infer::ResolvedTypes;
use tessel_model::{ElementId, Model};
use tessel_types::TypeRef;

const PROPTEST_CASES: u32 = 128;

/// Four locals and four candidate types to bind them to.
fn fixture() -> (Model, Vec<ElementId>, Vec<TypeRef>) {
    let mut model = Model::with_minimal_jdk();
    let locals = ["a", "b", "c", "d"]
        .iter()
        .map(|name| model.add_local(*name, None, true))
        .collect();
    let wk = model.well_known();
    let types = vec![
        TypeRef::simple(wk.string),
        TypeRef::simple(wk.prim_int),
        TypeRef::simple(wk.object),
        TypeRef::class(wk.list, vec![TypeRef::simple(wk.string)]),
    ];
    (model, locals, types)
}

fn arb_writes() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0usize..4, 0usize..4), 0..8)
}

fn snapshot(scope: &ResolvedTypes, locals: &[ElementId]) -> Vec<Option<TypeRef>> {
    locals.iter().map(|l| scope.element_type(*l)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: PROPTEST_CASES,
        ..ProptestConfig::default()
    })]

    #[test]
    fn nested_merges_overlay_inner_writes(outer in arb_writes(), inner in arb_writes()) {
        let (_model, locals, types) = fixture();
        let root = ResolvedTypes::root();
        let child = root.push();
        for (local, ty) in &outer {
            child.set_element_type(locals[*local], types[*ty].clone());
        }
        let grandchild = child.push();
        for (local, ty) in &inner {
            grandchild.set_element_type(locals[*local], types[*ty].clone());
        }

        let mut expected: HashMap<usize, usize> = HashMap::new();
        for (local, ty) in outer.iter().chain(&inner) {
            expected.insert(*local, *ty);
        }

        grandchild.merge_into_parent();
        child.merge_into_parent();

        for (idx, local) in locals.iter().enumerate() {
            prop_assert_eq!(
                root.element_type(*local),
                expected.get(&idx).map(|ty| types[*ty].clone())
            );
        }
    }

    #[test]
    fn merging_again_changes_nothing(outer in arb_writes(), inner in arb_writes()) {
        let (_model, locals, types) = fixture();
        let root = ResolvedTypes::root();
        let child = root.push();
        for (local, ty) in &outer {
            child.set_element_type(locals[*local], types[*ty].clone());
        }
        let grandchild = child.push();
        for (local, ty) in &inner {
            grandchild.set_element_type(locals[*local], types[*ty].clone());
        }

        grandchild.merge_into_parent();
        child.merge_into_parent();
        let once = snapshot(&root, &locals);

        // Writes made directly to the root after the first merge must survive a repeated
        // merge of children that did not change since.
        root.set_element_type(locals[0], types[2].clone());
        let mut expected = once.clone();
        expected[0] = Some(types[2].clone());

        grandchild.merge_into_parent();
        child.merge_into_parent();
        prop_assert_eq!(snapshot(&root, &locals), expected);
    }

    #[test]
    fn unmerged_siblings_stay_invisible(writes in arb_writes()) {
        let (_model, locals, types) = fixture();
        let root = ResolvedTypes::root();
        let left = root.push();
        let right = root.push();
        for (local, ty) in &writes {
            left.set_element_type(locals[*local], types[*ty].clone());
        }

        prop_assert!(snapshot(&right, &locals).iter().all(Option::is_none));
        prop_assert!(snapshot(&root, &locals).iter().all(Option::is_none));

        left.merge_into_parent();
        prop_assert_eq!(snapshot(&right, &locals), snapshot(&left, &locals));
    }
}

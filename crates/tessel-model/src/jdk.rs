//! Member declarations of the minimal JDK type set.

use tessel_types::{TypeEnv, TypeId, TypeRef};

use crate::element::{DeclaredType, OperationDecl, Visibility};
use crate::{ElementId, Model};

pub(crate) fn populate(model: &mut Model) {
    let wk = model.well_known().clone();
    let ty = TypeRef::simple;
    let object = ty(wk.object);
    let string = ty(wk.string);
    let int = ty(wk.prim_int);
    let boolean = ty(wk.prim_boolean);
    let char_ = ty(wk.prim_char);
    let double = ty(wk.prim_double);
    let void = ty(wk.void);

    let mut jdk = Jdk { model };

    let e = jdk.declare(wk.object);
    jdk.op(e, "toString", &[], &string);
    jdk.op(e, "hashCode", &[], &int);
    jdk.op(e, "equals", &[("obj", &object)], &boolean);
    jdk.ctor(e, &[]);

    let e = jdk.declare(wk.char_sequence);
    jdk.op(e, "length", &[], &int);
    jdk.op(e, "charAt", &[("index", &int)], &char_);

    let e = jdk.declare(wk.string);
    jdk.op(e, "length", &[], &int);
    jdk.op(e, "isEmpty", &[], &boolean);
    jdk.op(e, "charAt", &[("index", &int)], &char_);
    jdk.op(e, "substring", &[("beginIndex", &int)], &string);
    jdk.op(e, "substring", &[("beginIndex", &int), ("endIndex", &int)], &string);
    jdk.op(e, "toUpperCase", &[], &string);
    jdk.op(e, "concat", &[("str", &string)], &string);
    jdk.static_op(e, "valueOf", &[("obj", &object)], &string);
    jdk.static_op(e, "valueOf", &[("i", &int)], &string);
    jdk.ctor(e, &[]);
    jdk.ctor(e, &[("original", &string)]);

    let e = jdk.declare(wk.comparable);
    let t = jdk.type_param(wk.comparable, 0);
    jdk.op(e, "compareTo", &[("o", &t)], &int);

    let e = jdk.declare(wk.class);
    jdk.op(e, "getName", &[], &string);

    let e = jdk.declare(wk.number);
    jdk.op(e, "intValue", &[], &int);
    jdk.op(e, "doubleValue", &[], &double);

    let e = jdk.declare(wk.integer);
    let integer = ty(wk.integer);
    jdk.op(e, "intValue", &[], &int);
    jdk.static_op(e, "valueOf", &[("i", &int)], &integer);
    jdk.static_op(e, "parseInt", &[("s", &string)], &int);

    let e = jdk.declare(wk.boolean);
    jdk.op(e, "booleanValue", &[], &boolean);

    for id in [wk.long, wk.float, wk.double, wk.character] {
        jdk.declare(id);
    }

    let e = jdk.declare(wk.big_integer);
    let big_integer = ty(wk.big_integer);
    jdk.op(e, "add", &[("val", &big_integer)], &big_integer);
    jdk.ctor(e, &[("val", &string)]);

    let e = jdk.declare(wk.big_decimal);
    let big_decimal = ty(wk.big_decimal);
    jdk.op(e, "add", &[("augend", &big_decimal)], &big_decimal);
    jdk.ctor(e, &[("val", &string)]);

    let e = jdk.declare(wk.throwable);
    jdk.op(e, "getMessage", &[], &string);
    jdk.ctor(e, &[]);
    jdk.ctor(e, &[("message", &string)]);

    if let Some(exception) = jdk.model.types().type_id("java.lang.Exception") {
        let e = jdk.declare(exception);
        jdk.ctor(e, &[]);
        jdk.ctor(e, &[("message", &string)]);
    }

    let e = jdk.declare(wk.runtime_exception);
    jdk.ctor(e, &[]);
    jdk.ctor(e, &[("message", &string)]);

    jdk.declare(wk.iterable);

    let e = jdk.declare(wk.collection);
    let elem = jdk.type_param(wk.collection, 0);
    jdk.op(e, "size", &[], &int);
    jdk.op(e, "isEmpty", &[], &boolean);
    jdk.op(e, "add", &[("e", &elem)], &boolean);

    let e = jdk.declare(wk.list);
    let elem = jdk.type_param(wk.list, 0);
    jdk.op(e, "get", &[("index", &int)], &elem);

    let e = jdk.declare(wk.array_list);
    jdk.ctor(e, &[]);
    jdk.ctor(e, &[("initialCapacity", &int)]);

    let e = jdk.declare(wk.runnable);
    jdk.op(e, "run", &[], &void);

    let e = jdk.declare(wk.supplier);
    let t = jdk.type_param(wk.supplier, 0);
    jdk.op(e, "get", &[], &t);

    let e = jdk.declare(wk.consumer);
    let t = jdk.type_param(wk.consumer, 0);
    jdk.op(e, "accept", &[("t", &t)], &void);

    let e = jdk.declare(wk.function);
    let t = jdk.type_param(wk.function, 0);
    let r = jdk.type_param(wk.function, 1);
    jdk.op(e, "apply", &[("t", &t)], &r);

    let e = jdk.declare(wk.bi_function);
    let t = jdk.type_param(wk.bi_function, 0);
    let u = jdk.type_param(wk.bi_function, 1);
    let r = jdk.type_param(wk.bi_function, 2);
    jdk.op(e, "apply", &[("t", &t), ("u", &u)], &r);

    for p in [
        wk.void,
        wk.prim_boolean,
        wk.prim_char,
        wk.prim_int,
        wk.prim_long,
        wk.prim_float,
        wk.prim_double,
    ] {
        jdk.declare(p);
    }
}

struct Jdk<'a> {
    model: &'a mut Model,
}

impl Jdk<'_> {
    fn declare(&mut self, id: TypeId) -> ElementId {
        self.model.declare_type(id)
    }

    fn type_param(&self, id: TypeId, idx: usize) -> TypeRef {
        let object = TypeRef::simple(self.model.well_known().object);
        self.model
            .type_def(id)
            .and_then(|def| def.type_params.get(idx))
            .map_or(object, |tp| TypeRef::simple(*tp))
    }

    fn decl(name: &str, params: &[(&str, &TypeRef)], ret: &TypeRef) -> OperationDecl {
        params.iter().fold(
            OperationDecl::new(name, DeclaredType::Explicit(ret.clone())),
            |decl, (name, ty)| decl.param(*name, (*ty).clone()),
        )
    }

    fn op(&mut self, declaring: ElementId, name: &str, params: &[(&str, &TypeRef)], ret: &TypeRef) {
        self.model
            .add_operation(declaring, Self::decl(name, params, ret));
    }

    fn static_op(
        &mut self,
        declaring: ElementId,
        name: &str,
        params: &[(&str, &TypeRef)],
        ret: &TypeRef,
    ) {
        self.model
            .add_operation(declaring, Self::decl(name, params, ret).static_());
    }

    fn ctor(&mut self, declaring: ElementId, params: &[(&str, &TypeRef)]) {
        let params = params
            .iter()
            .map(|(name, ty)| ((*name).into(), (*ty).clone()))
            .collect();
        self.model
            .add_constructor(declaring, params, Visibility::Public);
    }
}

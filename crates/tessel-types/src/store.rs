use std::collections::HashMap;

use crate::{TypeId, TypeRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 6] = [
        PrimitiveType::Boolean,
        PrimitiveType::Char,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Char => "char",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    #[must_use]
    pub fn wrapper_name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "java.lang.Boolean",
            PrimitiveType::Char => "java.lang.Character",
            PrimitiveType::Int => "java.lang.Integer",
            PrimitiveType::Long => "java.lang.Long",
            PrimitiveType::Float => "java.lang.Float",
            PrimitiveType::Double => "java.lang.Double",
        }
    }

    /// Widening primitive conversion (JLS 5.1.2), identity excluded.
    #[must_use]
    pub fn widens_to(self, target: PrimitiveType) -> bool {
        use PrimitiveType::*;
        matches!(
            (self, target),
            (Char, Int | Long | Float | Double)
                | (Int, Long | Float | Double)
                | (Long, Float | Double)
                | (Float, Double)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
    Annotation,
    Primitive(PrimitiveType),
    Void,
    TypeParameter,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDef {
    /// Qualified name (`java.util.List`); type parameters use their simple name.
    pub name: String,
    pub kind: TypeKind,
    pub type_params: Vec<TypeId>,
    pub super_class: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    /// Bounds of a type parameter. Empty means `Object`.
    pub upper_bounds: Vec<TypeRef>,
}

impl TypeDef {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            type_params: Vec::new(),
            super_class: None,
            interfaces: Vec::new(),
            upper_bounds: Vec::new(),
        }
    }

    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.name
            .rsplit(['.', '$'])
            .next()
            .unwrap_or(self.name.as_str())
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface | TypeKind::Annotation)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WellKnownTypes {
    pub object: TypeId,
    pub string: TypeId,
    pub char_sequence: TypeId,
    pub comparable: TypeId,
    pub class: TypeId,
    pub number: TypeId,
    pub integer: TypeId,
    pub long: TypeId,
    pub float: TypeId,
    pub double: TypeId,
    pub boolean: TypeId,
    pub character: TypeId,
    pub big_integer: TypeId,
    pub big_decimal: TypeId,
    pub throwable: TypeId,
    pub runtime_exception: TypeId,
    pub iterable: TypeId,
    pub collection: TypeId,
    pub list: TypeId,
    pub array_list: TypeId,
    pub runnable: TypeId,
    pub supplier: TypeId,
    pub consumer: TypeId,
    pub function: TypeId,
    pub bi_function: TypeId,

    pub void: TypeId,
    pub prim_boolean: TypeId,
    pub prim_char: TypeId,
    pub prim_int: TypeId,
    pub prim_long: TypeId,
    pub prim_float: TypeId,
    pub prim_double: TypeId,
}

impl WellKnownTypes {
    #[must_use]
    pub fn primitive(&self, p: PrimitiveType) -> TypeId {
        match p {
            PrimitiveType::Boolean => self.prim_boolean,
            PrimitiveType::Char => self.prim_char,
            PrimitiveType::Int => self.prim_int,
            PrimitiveType::Long => self.prim_long,
            PrimitiveType::Float => self.prim_float,
            PrimitiveType::Double => self.prim_double,
        }
    }

    #[must_use]
    pub fn wrapper(&self, p: PrimitiveType) -> TypeId {
        match p {
            PrimitiveType::Boolean => self.boolean,
            PrimitiveType::Char => self.character,
            PrimitiveType::Int => self.integer,
            PrimitiveType::Long => self.long,
            PrimitiveType::Float => self.float,
            PrimitiveType::Double => self.double,
        }
    }

    /// The primitive a wrapper class unboxes to.
    #[must_use]
    pub fn unboxed(&self, wrapper: TypeId) -> Option<PrimitiveType> {
        PrimitiveType::ALL
            .into_iter()
            .find(|p| self.wrapper(*p) == wrapper)
    }
}

/// Read access to declared types.
pub trait TypeEnv {
    fn type_def(&self, id: TypeId) -> Option<&TypeDef>;
    fn lookup(&self, name: &str) -> Option<TypeId>;
    fn well_known(&self) -> &WellKnownTypes;
}

#[derive(Clone, Debug)]
pub struct TypeStore {
    defs: Vec<TypeDef>,
    by_name: HashMap<String, TypeId>,
    well_known: WellKnownTypes,
}

impl TypeStore {
    /// A store pre-populated with the handful of JDK types the engine relies on.
    pub fn with_minimal_jdk() -> Self {
        let mut b = JdkBuilder::default();

        let object = b.class("java.lang.Object", TypeKind::Class, None);
        let obj = TypeRef::simple(object);
        let char_sequence = b.class("java.lang.CharSequence", TypeKind::Interface, None);
        let (comparable, _) = b.generic("java.lang.Comparable", TypeKind::Interface, &["T"], None);
        let (class, _) = b.generic("java.lang.Class", TypeKind::Class, &["T"], Some(obj.clone()));
        let comparable_of = |id: TypeId| TypeRef::class(comparable, vec![TypeRef::simple(id)]);

        let string = b.class("java.lang.String", TypeKind::Class, Some(obj.clone()));
        b.implement(string, TypeRef::simple(char_sequence));
        b.implement(string, comparable_of(string));

        let number = b.class("java.lang.Number", TypeKind::Class, Some(obj.clone()));
        let num = TypeRef::simple(number);
        let wrapper = |b: &mut JdkBuilder, name: &str, sup: &TypeRef| {
            let id = b.class(name, TypeKind::Class, Some(sup.clone()));
            b.implement(id, comparable_of(id));
            id
        };
        let integer = wrapper(&mut b, "java.lang.Integer", &num);
        let long = wrapper(&mut b, "java.lang.Long", &num);
        let float = wrapper(&mut b, "java.lang.Float", &num);
        let double = wrapper(&mut b, "java.lang.Double", &num);
        let boolean = wrapper(&mut b, "java.lang.Boolean", &obj);
        let character = wrapper(&mut b, "java.lang.Character", &obj);
        let big_integer = wrapper(&mut b, "java.math.BigInteger", &num);
        let big_decimal = wrapper(&mut b, "java.math.BigDecimal", &num);

        let throwable = b.class("java.lang.Throwable", TypeKind::Class, Some(obj.clone()));
        let exception = b.class(
            "java.lang.Exception",
            TypeKind::Class,
            Some(TypeRef::simple(throwable)),
        );
        let runtime_exception = b.class(
            "java.lang.RuntimeException",
            TypeKind::Class,
            Some(TypeRef::simple(exception)),
        );

        let (iterable, _) = b.generic("java.lang.Iterable", TypeKind::Interface, &["T"], None);
        let (collection, e) = b.generic("java.util.Collection", TypeKind::Interface, &["E"], None);
        b.implement(
            collection,
            TypeRef::class(iterable, vec![TypeRef::simple(e[0])]),
        );
        let (list, e) = b.generic("java.util.List", TypeKind::Interface, &["E"], None);
        b.implement(list, TypeRef::class(collection, vec![TypeRef::simple(e[0])]));
        let (array_list, e) = b.generic(
            "java.util.ArrayList",
            TypeKind::Class,
            &["E"],
            Some(obj.clone()),
        );
        b.implement(array_list, TypeRef::class(list, vec![TypeRef::simple(e[0])]));

        let runnable = b.class("java.lang.Runnable", TypeKind::Interface, None);
        let (supplier, _) =
            b.generic("java.util.function.Supplier", TypeKind::Interface, &["T"], None);
        let (consumer, _) =
            b.generic("java.util.function.Consumer", TypeKind::Interface, &["T"], None);
        let (function, _) =
            b.generic("java.util.function.Function", TypeKind::Interface, &["T", "R"], None);
        let (bi_function, _) = b.generic(
            "java.util.function.BiFunction",
            TypeKind::Interface,
            &["T", "U", "R"],
            None,
        );

        let void = b.class("void", TypeKind::Void, None);
        let mut prim = |p: PrimitiveType| b.class(p.keyword(), TypeKind::Primitive(p), None);
        let prim_boolean = prim(PrimitiveType::Boolean);
        let prim_char = prim(PrimitiveType::Char);
        let prim_int = prim(PrimitiveType::Int);
        let prim_long = prim(PrimitiveType::Long);
        let prim_float = prim(PrimitiveType::Float);
        let prim_double = prim(PrimitiveType::Double);

        TypeStore {
            defs: b.defs,
            by_name: b.by_name,
            well_known: WellKnownTypes {
                object,
                string,
                char_sequence,
                comparable,
                class,
                number,
                integer,
                long,
                float,
                double,
                boolean,
                character,
                big_integer,
                big_decimal,
                throwable,
                runtime_exception,
                iterable,
                collection,
                list,
                array_list,
                runnable,
                supplier,
                consumer,
                function,
                bi_function,
                void,
                prim_boolean,
                prim_char,
                prim_int,
                prim_long,
                prim_float,
                prim_double,
            },
        }
    }

    /// Registers a declared type under its qualified name. Re-adding a name replaces the
    /// lookup entry but keeps the old id valid.
    pub fn add_type(&mut self, def: TypeDef) -> TypeId {
        let id = next_id(&self.defs);
        self.by_name.insert(def.name.clone(), id);
        self.defs.push(def);
        id
    }

    /// Type parameters are not reachable by name lookup.
    pub fn add_type_param(&mut self, name: impl Into<String>, upper_bounds: Vec<TypeRef>) -> TypeId {
        let id = next_id(&self.defs);
        let mut def = TypeDef::new(name, TypeKind::TypeParameter);
        def.upper_bounds = upper_bounds;
        self.defs.push(def);
        id
    }

    pub fn type_def_mut(&mut self, id: TypeId) -> Option<&mut TypeDef> {
        self.defs.get_mut(id.idx())
    }

    #[must_use]
    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl TypeEnv for TypeStore {
    fn type_def(&self, id: TypeId) -> Option<&TypeDef> {
        self.defs.get(id.idx())
    }

    fn lookup(&self, name: &str) -> Option<TypeId> {
        self.type_id(name)
    }

    fn well_known(&self) -> &WellKnownTypes {
        &self.well_known
    }
}

fn next_id(defs: &[TypeDef]) -> TypeId {
    let raw: u32 = defs
        .len()
        .try_into()
        .unwrap_or_else(|_| panic!("type store overflow: {} definitions", defs.len()));
    TypeId::from_raw(raw)
}

#[derive(Default)]
struct JdkBuilder {
    defs: Vec<TypeDef>,
    by_name: HashMap<String, TypeId>,
}

impl JdkBuilder {
    fn push(&mut self, def: TypeDef, named: bool) -> TypeId {
        let id = next_id(&self.defs);
        if named {
            self.by_name.insert(def.name.clone(), id);
        }
        self.defs.push(def);
        id
    }

    fn class(&mut self, name: &str, kind: TypeKind, super_class: Option<TypeRef>) -> TypeId {
        let mut def = TypeDef::new(name, kind);
        def.super_class = super_class;
        self.push(def, true)
    }

    fn generic(
        &mut self,
        name: &str,
        kind: TypeKind,
        params: &[&str],
        super_class: Option<TypeRef>,
    ) -> (TypeId, Vec<TypeId>) {
        let params: Vec<TypeId> = params
            .iter()
            .map(|p| self.push(TypeDef::new(*p, TypeKind::TypeParameter), false))
            .collect();
        let mut def = TypeDef::new(name, kind);
        def.super_class = super_class;
        def.type_params = params.clone();
        (self.push(def, true), params)
    }

    fn implement(&mut self, id: TypeId, iface: TypeRef) {
        self.defs[id.idx()].interfaces.push(iface);
    }
}

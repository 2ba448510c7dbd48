//! Candidate lookup: the collaborator that lists the declarations a symbolic reference may
//! bind to.

use tessel_config::InferenceConfig;
use tessel_core::{Name, Span};
use tessel_model::{ElementId, ElementKind, ExprId, ExprKind, Model};
use tessel_types::{all_super_types, declaring_type_mapping, identifier, substitute, TypeRef};

use crate::{FeatureScopeSession, InferError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Feature,
    Assignment,
    Constructor,
}

/// Everything the lookup knows about the reference being resolved.
#[derive(Clone, Debug)]
pub struct LookupSite {
    pub expr: ExprId,
    pub kind: ReferenceKind,
    pub name: Name,
    pub receiver: Option<ExprId>,
    /// The demand-computed type of `receiver`.
    pub receiver_type: Option<TypeRef>,
    /// The instantiated type of a constructor call.
    pub constructed_type: Option<TypeRef>,
    pub arg_count: usize,
    pub span: Span,
}

/// Read access to the types computed so far, handed to the lookup by the engine.
pub trait TypeOracle {
    /// The actual type of `expr`, computed on demand when it is not known yet.
    fn actual_type(&self, expr: ExprId) -> Result<Option<TypeRef>, InferError>;
    /// The type of a local, parameter or member; `None` while it is being computed.
    fn element_type(&self, element: ElementId) -> Result<Option<TypeRef>, InferError>;
    fn linked_element(&self, expr: ExprId) -> Option<ElementId>;
}

/// How a candidate was reached. Lower ranks are closer to the static receiver type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bucket {
    pub receiver_type: Option<TypeRef>,
    pub implicit_receiver: Option<ElementId>,
    pub rank: u32,
    pub static_access: bool,
}

impl Bucket {
    fn explicit(receiver_type: Option<TypeRef>, static_access: bool) -> Self {
        Self {
            receiver_type,
            implicit_receiver: None,
            rank: 0,
            static_access,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NamedCandidate {
    Element { element: ElementId, bucket: Bucket },
    /// Nothing visible matches; carries what was looked for.
    Error { name: Name, span: Span },
}

pub trait CandidateLookup {
    /// Candidates in discovery order. Must never be empty: an unmatched name yields a single
    /// [`NamedCandidate::Error`].
    fn candidates_for(
        &self,
        model: &Model,
        site: &LookupSite,
        session: &FeatureScopeSession,
        oracle: &dyn TypeOracle,
    ) -> Result<Vec<NamedCandidate>, InferError>;
}

const THIS_RANK: u32 = 100;
const IMPLICIT_RANK: u32 = 200;
const PROPERTY_RANK: u32 = 50;

/// Default lookup over the members declared in a [`Model`].
#[derive(Clone, Debug)]
pub struct ModelLookup {
    implicit_receivers: Vec<Name>,
    property_access: bool,
}

impl Default for ModelLookup {
    fn default() -> Self {
        Self::new(&InferenceConfig::default())
    }
}

impl ModelLookup {
    pub fn new(config: &InferenceConfig) -> Self {
        Self {
            implicit_receivers: config
                .implicit_receivers
                .iter()
                .map(|name| Name::new(name))
                .collect(),
            property_access: config.property_access,
        }
    }

    fn constructors(&self, model: &Model, site: &LookupSite) -> Vec<NamedCandidate> {
        let Some(ty) = site.constructed_type.as_ref() else {
            return Vec::new();
        };
        let Some(element) = ty.type_id().and_then(|id| model.type_element(id)) else {
            return Vec::new();
        };
        model
            .members(element)
            .iter()
            .filter(|m| matches!(model.element(**m).kind, ElementKind::Constructor(_)))
            .map(|m| NamedCandidate::Element {
                element: *m,
                bucket: Bucket::explicit(Some(ty.clone()), false),
            })
            .collect()
    }

    fn features(
        &self,
        model: &Model,
        site: &LookupSite,
        session: &FeatureScopeSession,
        oracle: &dyn TypeOracle,
        name: &str,
    ) -> Result<Vec<NamedCandidate>, InferError> {
        let mut out = Vec::new();

        if let Some(receiver) = site.receiver {
            if let ExprKind::TypeLiteral(ty) = &model.expr(receiver).kind {
                let bucket = Bucket::explicit(Some(ty.clone()), true);
                collect_members(model, ty, name, &bucket, &mut out);
                return Ok(out);
            }
            let receiver_type = match site.receiver_type.as_ref().map(TypeRef::resolved) {
                None | Some(TypeRef::Any) => TypeRef::simple(model.well_known().object),
                Some(ty) => ty.boxed(model),
            };
            let bucket = Bucket::explicit(Some(receiver_type.clone()), false);
            collect_members(model, &receiver_type, name, &bucket, &mut out);
            return Ok(out);
        }

        if site.arg_count == 0 || site.kind == ReferenceKind::Assignment {
            if let Some(local) = session.local(name) {
                out.push(NamedCandidate::Element {
                    element: local,
                    bucket: Bucket::explicit(None, false),
                });
            }
        }

        if let Some(this_local) = session.local("this") {
            if let Some(this_type) = oracle.element_type(this_local)? {
                let bucket = Bucket {
                    receiver_type: Some(this_type.clone()),
                    implicit_receiver: Some(this_local),
                    rank: THIS_RANK,
                    static_access: false,
                };
                collect_members(model, &this_type, name, &bucket, &mut out);
            }
        }

        for (idx, receiver_name) in self.implicit_receivers.iter().enumerate() {
            let Some(local) = session.local(receiver_name.as_str()) else {
                continue;
            };
            let Some(ty) = oracle.element_type(local)? else {
                continue;
            };
            let ty = ty.boxed(model);
            let bucket = Bucket {
                receiver_type: Some(ty.clone()),
                implicit_receiver: Some(local),
                rank: IMPLICIT_RANK + 10 * idx as u32,
                static_access: false,
            };
            collect_members(model, &ty, name, &bucket, &mut out);
        }

        Ok(out)
    }

    fn property_accessors(
        &self,
        model: &Model,
        site: &LookupSite,
        session: &FeatureScopeSession,
        oracle: &dyn TypeOracle,
    ) -> Result<Vec<NamedCandidate>, InferError> {
        let (prefixes, arity): (&[&str], usize) = match site.kind {
            ReferenceKind::Feature if site.arg_count == 0 => (&["get", "is"], 0),
            ReferenceKind::Assignment => (&["set"], 1),
            _ => return Ok(Vec::new()),
        };

        let mut out = Vec::new();
        for prefix in prefixes {
            let accessor = accessor_name(prefix, site.name.as_str());
            for candidate in self.features(model, site, session, oracle, &accessor)? {
                if let NamedCandidate::Element { element, mut bucket } = candidate {
                    let is_accessor = matches!(
                        &model.element(element).kind,
                        ElementKind::Operation(op) if op.params.len() == arity
                    );
                    if is_accessor {
                        bucket.rank += PROPERTY_RANK;
                        out.push(NamedCandidate::Element { element, bucket });
                    }
                }
            }
        }
        Ok(out)
    }
}

impl CandidateLookup for ModelLookup {
    fn candidates_for(
        &self,
        model: &Model,
        site: &LookupSite,
        session: &FeatureScopeSession,
        oracle: &dyn TypeOracle,
    ) -> Result<Vec<NamedCandidate>, InferError> {
        let mut out = match site.kind {
            ReferenceKind::Constructor => self.constructors(model, site),
            ReferenceKind::Feature | ReferenceKind::Assignment => {
                self.features(model, site, session, oracle, site.name.as_str())?
            }
        };
        if out.is_empty() && self.property_access {
            out = self.property_accessors(model, site, session, oracle)?;
        }
        if out.is_empty() {
            tracing::trace!(target: "tessel.infer", name = %site.name, expr = ?site.expr, "no candidates");
            out.push(NamedCandidate::Error {
                name: site.name.clone(),
                span: site.span,
            });
        }
        Ok(out)
    }
}

fn accessor_name(prefix: &str, property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("{prefix}{}{}", first.to_uppercase(), chars.as_str()),
        None => prefix.to_owned(),
    }
}

/// Fields and operations named `name` on `ty` and its supertypes, nearest first. Operations
/// overridden further down and fields hidden further down are skipped.
fn collect_members(
    model: &Model,
    ty: &TypeRef,
    name: &str,
    bucket: &Bucket,
    out: &mut Vec<NamedCandidate>,
) {
    let mut hierarchy = vec![ty.clone()];
    hierarchy.extend(all_super_types(model, ty));

    let mut seen: Vec<Option<Vec<String>>> = Vec::new();
    for (depth, view) in hierarchy.iter().enumerate() {
        let Some(id) = view.type_id() else {
            continue;
        };
        let Some(type_element) = model.type_element(id) else {
            continue;
        };
        let mapping = declaring_type_mapping(model, ty, id);
        for member in model.members(type_element) {
            let element = model.element(*member);
            if element.name != name {
                continue;
            }
            let signature = match &element.kind {
                ElementKind::Field(_) => None,
                ElementKind::Operation(_) => Some(
                    model
                        .param_types(*member)
                        .iter()
                        .map(|p| identifier(model, &substitute(p, &mapping)))
                        .collect(),
                ),
                _ => continue,
            };
            if seen.contains(&signature) {
                continue;
            }
            seen.push(signature);

            out.push(NamedCandidate::Element {
                element: *member,
                bucket: Bucket {
                    rank: bucket.rank + depth as u32,
                    implicit_receiver: if element.is_static() {
                        None
                    } else {
                        bucket.implicit_receiver
                    },
                    ..bucket.clone()
                },
            });
        }
    }
}

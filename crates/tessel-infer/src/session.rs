use std::fmt;
use std::rc::Rc;

use tessel_core::Name;
use tessel_model::ElementId;
use tessel_types::TypeId;

/// The visibility scope handed to the candidate lookup: the locals in scope (innermost first)
/// and the declared type the code belongs to.
///
/// Sessions are persistent. Adding a local returns a new session that shares its tail with the
/// old one, so forked computation states never observe each other's locals.
#[derive(Clone, Default)]
pub struct FeatureScopeSession {
    locals: Option<Rc<LocalNode>>,
    context_type: Option<TypeId>,
    static_context: bool,
}

struct LocalNode {
    name: Name,
    element: ElementId,
    parent: Option<Rc<LocalNode>>,
}

impl FeatureScopeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session for code declared inside `ty`.
    #[must_use]
    pub fn with_context_type(&self, ty: TypeId) -> Self {
        Self {
            context_type: Some(ty),
            static_context: false,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_static_context(&self, is_static: bool) -> Self {
        Self {
            static_context: is_static,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn add_local(&self, name: Name, element: ElementId) -> Self {
        Self {
            locals: Some(Rc::new(LocalNode {
                name,
                element,
                parent: self.locals.clone(),
            })),
            ..self.clone()
        }
    }

    /// The innermost local named `name`.
    #[must_use]
    pub fn local(&self, name: &str) -> Option<ElementId> {
        self.nodes()
            .find(|node| node.name == name)
            .map(|node| node.element)
    }

    /// Visible locals, innermost first; shadowed entries are skipped.
    #[must_use]
    pub fn locals(&self) -> Vec<(Name, ElementId)> {
        let mut out: Vec<(Name, ElementId)> = Vec::new();
        for node in self.nodes() {
            if out.iter().all(|(name, _)| *name != node.name) {
                out.push((node.name.clone(), node.element));
            }
        }
        out
    }

    #[must_use]
    pub fn context_type(&self) -> Option<TypeId> {
        self.context_type
    }

    pub fn is_static_context(&self) -> bool {
        self.static_context
    }

    fn nodes(&self) -> impl Iterator<Item = &LocalNode> {
        std::iter::successors(self.locals.as_deref(), |node| node.parent.as_deref())
    }
}

impl fmt::Debug for FeatureScopeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureScopeSession")
            .field("locals", &self.locals())
            .field("context_type", &self.context_type)
            .field("static_context", &self.static_context)
            .finish()
    }
}

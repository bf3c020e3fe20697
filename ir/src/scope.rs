//! The scope stack (spec.md §4.4): name resolution and path-factoring
//! binding keys share this one mutable structure, since the two passes are
//! "tightly coupled" enough that spec.md §2 allows implementing them as a
//! single traversal — which is what the `ir` crate's builder does.
//!
//! Design note (spec.md §9 "Path factoring"): the *only* fact this module
//! needs to track is the binding-key equivalence class of root symbols in
//! each scope. Everything else — the longest-common-prefix hoist itself —
//! is the SQL generator's job, not this module's.

use ql_catalog::{AliasId, GlobalId, ObjectId, TypeRef};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingKey(pub u32);

/// A local (non-catalog) binding: a `with`-alias, a `for`-iterator
/// variable, or the implicit `.` subject of a shape/filter/order-by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

/// The sequence of enclosing scopes containing an IR node (spec.md §3.3:
/// "Scope path"), recorded by index into the scope stack at the moment the
/// node was built. Only used for diagnostics and `describe`; factoring
/// itself is driven by [`BindingKey`] equivalence, not by comparing paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopePath(pub Vec<ScopeKind>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    TopLevel,
    SelectBody,
    ShapeElement,
    WithBinding,
    ForBody,
    Subquery,
    AggregateArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopingMode {
    /// "Factor any shared-symbol occurrence that is not in a sibling
    /// scope, including across `order by`/`filter`" (spec.md §4.4).
    Legacy,
    /// "Factor only inside a shape applied to a subject path, and inside
    /// `filter`/`order by` attached to a statement whose subject is a
    /// path" (spec.md §4.4).
    Simple,
}

#[derive(Debug, Clone, Copy)]
pub struct LocalBinding {
    pub key: BindingKey,
    pub ty: TypeRef,
    pub cardinality: crate::cardinality::Cardinality,
}

#[derive(Debug, Clone, Copy)]
enum RootEntity {
    Object(ObjectId),
    Alias(AliasId),
    Global(GlobalId),
}

struct Frame {
    kind: ScopeKind,
    module: String,
    /// `with`/`for`/shape-subject bindings introduced directly by this
    /// frame's construct.
    locals: FxHashMap<String, LocalBinding>,
    /// Binding keys already assigned, in this frame, to bare schema-entity
    /// root symbols (spec.md §4.4: "Two syntactic occurrences of the same
    /// root symbol within the same scope share a binding key").
    root_keys: FxHashMap<String, BindingKey>,
    /// Simple-scoping only: whether a *new* factoring key may be recorded
    /// in this frame (spec.md §4.4's simple-scoping allowlist: "inside a
    /// shape applied to a subject path" / "`filter`/`order by` attached to
    /// a statement whose subject is a path").
    factor_allowed: bool,
}

/// The name-resolution + path-factoring scope stack (spec.md §4.4). Pushes
/// and pops mirror AST nesting; lookups walk from the innermost frame
/// outward, which is exactly "nearest first" short-name resolution and
/// "nested subscope inherits enclosing binding key" for path factoring —
/// the same walk answers both questions.
pub struct ScopeStack {
    frames: Vec<Frame>,
    mode: ScopingMode,
    next_key: u32,
    next_local: u32,
}

pub enum Resolved {
    Local(LocalId, LocalBinding),
    Object(ObjectId),
    Alias(AliasId),
    Global(GlobalId),
}

impl ScopeStack {
    pub fn new(mode: ScopingMode, default_module: String) -> Self {
        let mut stack = ScopeStack { frames: Vec::new(), mode, next_key: 0, next_local: 0 };
        stack.frames.push(Frame {
            kind: ScopeKind::TopLevel,
            module: default_module,
            locals: FxHashMap::default(),
            root_keys: FxHashMap::default(),
            factor_allowed: matches!(mode, ScopingMode::Legacy),
        });
        stack
    }

    pub fn mode(&self) -> ScopingMode {
        self.mode
    }

    pub fn active_module(&self) -> &str {
        &self.frames.last().expect("scope stack never empty").module
    }

    /// Pushes a new scope. `factor_allowed` matters only in
    /// [`ScopingMode::Simple`]; legacy always allows factoring everywhere
    /// (spec.md §4.4).
    pub fn push(&mut self, kind: ScopeKind, factor_allowed: bool) {
        let module = self.active_module().to_string();
        self.frames.push(Frame {
            kind,
            module,
            locals: FxHashMap::default(),
            root_keys: FxHashMap::default(),
            factor_allowed: matches!(self.mode, ScopingMode::Legacy) || factor_allowed,
        });
    }

    pub fn pop(&mut self) {
        self.frames.pop();
        debug_assert!(!self.frames.is_empty(), "must not pop the top-level frame");
    }

    pub fn set_active_module(&mut self, module: String) {
        self.frames.last_mut().expect("scope stack never empty").module = module;
    }

    pub fn current_path(&self) -> ScopePath {
        ScopePath(self.frames.iter().map(|f| f.kind).collect())
    }

    fn fresh_key(&mut self) -> BindingKey {
        let key = BindingKey(self.next_key);
        self.next_key += 1;
        key
    }

    pub fn fresh_local(&mut self) -> LocalId {
        let id = LocalId(self.next_local);
        self.next_local += 1;
        id
    }

    /// Introduces a local binding (`with n := …`, `for x in …`, or a
    /// shape's implicit `.` subject) in the current frame with a fresh
    /// binding key (spec.md §4.4: "aliases introduced by `with` always get
    /// fresh binding keys even if their body is a bare set reference").
    pub fn declare_local(&mut self, name: &str, ty: TypeRef, cardinality: crate::cardinality::Cardinality) -> (LocalId, BindingKey) {
        let key = self.fresh_key();
        let id = self.fresh_local();
        let binding = LocalBinding { key, ty, cardinality };
        self.frames.last_mut().expect("scope stack never empty").locals.insert(name.to_string(), binding);
        (id, key)
    }

    /// Short-name lookup (spec.md §4.4): "(1) names introduced in any
    /// enclosing scope (nearest first)". Returns `None` if no local binding
    /// shadows `name`, in which case the caller falls through to the
    /// catalog's module/`std` lookup.
    pub fn lookup_local(&self, name: &str) -> Option<LocalBinding> {
        self.frames.iter().rev().find_map(|f| f.locals.get(name).copied())
    }

    /// Binding key for a bare schema-entity root reference (e.g. `User` in
    /// `User.friends`), per the factoring rules of spec.md §4.4 and the
    /// mode-dependent allowlist. `detached` bypasses this entirely — the
    /// caller should call [`ScopeStack::detached_key`] instead.
    pub fn entity_root_key(&mut self, qualified_name: &str) -> BindingKey {
        if let Some(found) = self.frames.iter().rev().find_map(|f| f.root_keys.get(qualified_name).copied()) {
            return found;
        }
        let key = self.fresh_key();
        let current = self.frames.last_mut().expect("scope stack never empty");
        if current.factor_allowed {
            current.root_keys.insert(qualified_name.to_string(), key);
        }
        key
    }

    /// `detached expr` "forces a fresh binding key regardless of symbol
    /// identity" (spec.md §4.4); never recorded for reuse.
    pub fn detached_key(&mut self) -> BindingKey {
        self.fresh_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cardinality::Cardinality;

    fn object(n: u32) -> ObjectId {
        ObjectId(n)
    }

    #[test]
    fn legacy_mode_factors_siblings_under_same_frame() {
        let mut scopes = ScopeStack::new(ScopingMode::Legacy, "default".into());
        let a = scopes.entity_root_key("default::User");
        let b = scopes.entity_root_key("default::User");
        assert_eq!(a, b, "same root symbol in the same scope must share a binding key");
    }

    #[test]
    fn simple_mode_does_not_factor_a_bare_tuple() {
        // `select (User.first_name, User.last_name)`: a bare tuple is not
        // a shape applied to a path subject, so simple scoping must not
        // allow factoring here (spec.md §8 scenario 6).
        let mut scopes = ScopeStack::new(ScopingMode::Simple, "default".into());
        let a = scopes.entity_root_key("default::User");
        let b = scopes.entity_root_key("default::User");
        assert_ne!(a, b, "simple scoping must not factor outside an allowed context");
    }

    #[test]
    fn simple_mode_factors_inside_an_allowed_shape_context() {
        let mut scopes = ScopeStack::new(ScopingMode::Simple, "default".into());
        scopes.push(ScopeKind::ShapeElement, true);
        let a = scopes.entity_root_key("default::User");
        let b = scopes.entity_root_key("default::User");
        assert_eq!(a, b);
    }

    #[test]
    fn nested_subscope_inherits_enclosing_binding_key() {
        let mut scopes = ScopeStack::new(ScopingMode::Legacy, "default".into());
        let outer = scopes.entity_root_key("default::User");
        scopes.push(ScopeKind::Subquery, false);
        let inner = scopes.entity_root_key("default::User");
        assert_eq!(outer, inner);
    }

    #[test]
    fn sibling_subscopes_do_not_share_a_newly_created_key() {
        let mut scopes = ScopeStack::new(ScopingMode::Simple, "default".into());
        scopes.push(ScopeKind::Subquery, false);
        let first = scopes.entity_root_key("default::Post");
        scopes.pop();
        scopes.push(ScopeKind::Subquery, false);
        let second = scopes.entity_root_key("default::Post");
        scopes.pop();
        assert_ne!(first, second);
    }

    #[test]
    fn detached_always_gets_a_fresh_key() {
        let mut scopes = ScopeStack::new(ScopingMode::Legacy, "default".into());
        let a = scopes.entity_root_key("default::User");
        let b = scopes.detached_key();
        assert_ne!(a, b);
    }

    #[test]
    fn with_alias_gets_a_fresh_key_even_for_a_bare_set_reference() {
        let mut scopes = ScopeStack::new(ScopingMode::Legacy, "default".into());
        let base = scopes.entity_root_key("default::User");
        let (_, alias_key) = scopes.declare_local("u", TypeRef::Object(object(0)), Cardinality::Many);
        assert_ne!(base, alias_key);
    }
}

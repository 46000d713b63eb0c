//! Class kernel
//!
//! A class is a node in an arena of class nodes (see
//! [`registry`](crate::registry)). It owns:
//!
//! - a **prototype**: the object instances delegate to, itself delegating
//!   to the parent class prototype;
//! - a **class object**: the receiver of class-level calls, delegating to
//!   the metaclass prototype;
//! - a **metaclass**: a class whose prototype holds the class-level
//!   members and delegates to the parent's metaclass prototype;
//! - its own **mixin history**.
//!
//! The metaclass hierarchy mirrors the class hierarchy one level removed,
//! by construction: [`Class::extend`] always derives the new metaclass from
//! the receiver's metaclass.
//!
//! `extend`, `reopen` and `reopen_class` share one mutation path,
//! [`Class::apply`]. It is the only place that installs members, and so the
//! only place that wraps functions for super calls, flattens mixins and runs
//! attribute triggers.
//!
//! Reopening mutates the shared class in place. Existing instances and
//! subclasses observe the change immediately; calls already running keep
//! the function they resolved.

use crate::bundle::{Bundle, Definition, Part, NAME_MEMBER};
use crate::error::{ClassError, ClassResult};
use crate::function::{Frame, Function};
use crate::mixin::Mixin;
use crate::object::{Object, Slot};
use crate::registry::{with_registry_mut, ClassId};
use crate::settings;
use crate::trigger::TriggerDetails;
use crate::value::Value;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

/// Instance initializer, called by [`Class::create`]
pub const INIT_MEMBER: &str = "init";

/// Allocation hook, called by [`Class::new_instance`] for each class of the
/// lineage that defines it
pub const NEW_MEMBER: &str = "new";

/// The root class
static BASE: Lazy<Class> = Lazy::new(Class::bootstrap);

fn noop(_: &Frame, _: &[Value]) -> ClassResult<Value> {
    Ok(Value::Undefined)
}

/// What a class node is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// Ordinary class
    Ordinary,
    /// Metaclass: holds the class-level members of one class
    Meta,
    /// The mixin class; cannot be extended
    Mixin,
}

/// Which side of a class a member is installed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Class prototype (instance members)
    Instance,
    /// Metaclass prototype (class-level members)
    Static,
}

/// Shared handle to a class node
#[derive(Clone)]
pub struct Class(Arc<ClassNode>);

pub(crate) struct ClassNode {
    /// Class ID
    id: ClassId,
    kind: ClassKind,
    /// Parent class (None for root classes)
    parent: Option<Class>,
    /// Object instances delegate to
    prototype: Object,
    /// Receiver of class-level calls
    class_object: Object,
    /// None for metaclasses
    meta: Option<Class>,
    /// Mixins recorded against this class, in application order
    mixins: RwLock<Vec<Mixin>>,
}

/// Registry-side handle that does not keep a class alive
#[derive(Debug, Clone)]
pub(crate) struct WeakClass(Weak<ClassNode>);

impl WeakClass {
    pub(crate) fn upgrade(&self) -> Option<Class> {
        self.0.upgrade().map(Class)
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl Class {
    /// The root class every class derives from
    pub fn base() -> Class {
        BASE.clone()
    }

    fn bootstrap() -> Class {
        let meta = Class::allocate(ClassKind::Meta, None, None);
        let root = Class::allocate(ClassKind::Ordinary, None, Some(meta));

        root.prototype()
            .define(INIT_MEMBER, Function::named(INIT_MEMBER, noop));
        root.prototype()
            .define(NEW_MEMBER, Function::named(NEW_MEMBER, noop));

        tracing::debug!(class = root.id(), "root class bootstrapped");
        root
    }

    /// Create and register a node
    fn allocate(kind: ClassKind, parent: Option<&Class>, meta: Option<Class>) -> Class {
        with_registry_mut(|registry| {
            let id = registry.next_class_id();
            let prototype = match parent {
                Some(parent) => Object::inheriting(parent.prototype()),
                None => Object::plain(),
            };
            let class_object = match &meta {
                Some(meta) => Object::inheriting(meta.prototype()),
                None => Object::plain(),
            };

            let class = Class(Arc::new(ClassNode {
                id,
                kind,
                parent: parent.cloned(),
                prototype,
                class_object,
                meta,
                mixins: RwLock::new(Vec::new()),
            }));
            registry.register_class(&class);
            class
        })
    }

    /// Derive a subclass and its metaclass without applying any members
    pub(crate) fn derive(&self, kind: ClassKind) -> Class {
        let meta_parent = self.metaclass();
        let meta = Class::allocate(ClassKind::Meta, meta_parent.as_ref(), None);
        Class::allocate(kind, Some(self), Some(meta))
    }

    /// Derive a new class from `self` and apply `definition` to it.
    ///
    /// Fails with [`ClassError::CannotExtendMixin`] on the mixin class.
    pub fn extend(&self, definition: impl Into<Definition>) -> ClassResult<Class> {
        if self.0.kind == ClassKind::Mixin {
            return Err(ClassError::CannotExtendMixin);
        }

        let class = self.derive(ClassKind::Ordinary);
        tracing::debug!(parent = self.id(), class = class.id(), "extending class");

        let (instance, statics) = definition.into().into_parts();
        class.apply(Side::Instance, instance, false)?;
        class.apply(Side::Static, statics, false)?;
        Ok(class)
    }

    /// Apply `definition` to this class in place.
    ///
    /// Instance parts go to the prototype, static parts to the metaclass.
    pub fn reopen(&self, definition: impl Into<Definition>) -> ClassResult<Class> {
        tracing::debug!(class = self.id(), "reopening class");
        let (instance, statics) = definition.into().into_parts();
        self.apply(Side::Instance, instance, true)?;
        self.apply(Side::Static, statics, true)?;
        Ok(self.clone())
    }

    /// Apply every part of `definition` to the class side in place
    pub fn reopen_class(&self, definition: impl Into<Definition>) -> ClassResult<Class> {
        tracing::debug!(class = self.id(), "reopening class side");
        let (instance, statics) = definition.into().into_parts();
        self.apply(Side::Static, instance, true)?;
        self.apply(Side::Static, statics, true)?;
        Ok(self.clone())
    }

    /// Allocate an instance and run the `new` hooks, root first.
    ///
    /// Each class of the lineage whose prototype defines `new` as an own
    /// member gets it called once with `args`. `init` is not called. Inside
    /// a `new` hook `_super` is a no-op, since the ancestors' hooks already
    /// ran.
    pub fn new_instance(&self, args: &[Value]) -> ClassResult<Object> {
        let instance = Object::instance(self);
        let receiver = Value::Object(instance.clone());

        for class in self.lineage() {
            if let Some(Slot::Value(Value::Function(hook))) = class.prototype().own_slot(NEW_MEMBER)
            {
                hook.apply(receiver.clone(), args)?;
            }
        }
        Ok(instance)
    }

    /// Allocate an instance, run the `new` hooks, then call `init`.
    ///
    /// `init` is dispatched normally: a descendant's `init` reaches its
    /// ancestors' only through explicit super calls.
    pub fn create(&self, args: &[Value]) -> ClassResult<Object> {
        let instance = self.new_instance(args)?;
        instance.call(INIT_MEMBER, args)?;
        Ok(instance)
    }

    /// Install parts on one side of the class
    pub(crate) fn apply(&self, side: Side, parts: Vec<Part>, reopen: bool) -> ClassResult<()> {
        let target = self.side(side)?;
        for part in parts {
            match part {
                Part::Members(bundle) => target.apply_bundle(&bundle, reopen)?,
                Part::Mixin(mixin) => target.apply_mixin(&mixin, reopen)?,
            }
        }
        Ok(())
    }

    fn side(&self, side: Side) -> ClassResult<Class> {
        match side {
            Side::Instance => Ok(self.clone()),
            Side::Static => self.metaclass().ok_or_else(|| {
                ClassError::runtime(format!("{} has no class side", self))
            }),
        }
    }

    fn apply_bundle(&self, bundle: &Bundle, reopen: bool) -> ClassResult<()> {
        for (name, value) in bundle.iter() {
            self.apply_member(name, value, reopen)?;
        }
        Ok(())
    }

    fn apply_member(&self, name: &str, value: &Value, reopen: bool) -> ClassResult<()> {
        let prototype = self.prototype();
        match value {
            Value::Trigger(trigger) => {
                tracing::debug!(class = self.id(), member = name, reopen, "invoking attribute trigger");
                let details = TriggerDetails {
                    class: self,
                    prototype,
                    side: self.installs(),
                };
                trigger.invoke(name, reopen, &details)
            }
            Value::Mixin(mixin) => self.apply_mixin(mixin, reopen),
            Value::Function(function) => {
                let current = match prototype.lookup(name) {
                    Some(Slot::Value(Value::Function(existing))) => Some(existing),
                    _ => None,
                };
                if let Some(current) = &current {
                    if current.unwrapped().ptr_eq(function.unwrapped()) {
                        return Ok(());
                    }
                }
                let overridden = match current {
                    // `new_instance` sequences the lineage's `new` hooks itself
                    _ if name == NEW_MEMBER && self.installs() == Side::Instance => {
                        Function::noop()
                    }
                    Some(existing) => existing,
                    None => Function::noop(),
                };
                prototype.define(name, Function::wrap(function, overridden, name));
                Ok(())
            }
            other => {
                prototype.define(name, other.clone());
                Ok(())
            }
        }
    }

    fn apply_mixin(&self, mixin: &Mixin, reopen: bool) -> ClassResult<()> {
        let flattened = mixin.flattened();
        let recorded = self.record_mixins(&flattened);
        tracing::debug!(
            class = self.id(),
            mixin = mixin.id(),
            recorded,
            "applying mixin"
        );

        for applied in &flattened {
            self.apply_bundle(applied.members(), reopen)?;
        }
        Ok(())
    }

    /// Append the mixins not yet known to this class or its ancestors
    fn record_mixins(&self, flattened: &[Mixin]) -> usize {
        let known = self.mixins();
        let mut own = self.0.mixins.write();
        let mut recorded = 0;
        for mixin in flattened {
            let seen = known.iter().chain(own.iter()).any(|m| m.ptr_eq(mixin));
            if !seen {
                own.push(mixin.clone());
                recorded += 1;
            }
        }
        recorded
    }

    /// Read a class-level member
    pub fn get(&self, name: &str) -> ClassResult<Value> {
        self.0
            .class_object
            .get_with_receiver(name, &Value::Class(self.clone()))
    }

    /// Write a class-level member
    pub fn set(&self, name: &str, value: impl Into<Value>) -> ClassResult<()> {
        self.0
            .class_object
            .set_with_receiver(name, value.into(), &Value::Class(self.clone()))
    }

    /// Call a class-level member with the class as receiver
    pub fn call(&self, name: &str, args: &[Value]) -> ClassResult<Value> {
        Value::Class(self.clone()).call(name, args)
    }

    /// Class ID
    pub fn id(&self) -> ClassId {
        self.0.id
    }

    /// Node kind
    pub fn kind(&self) -> ClassKind {
        self.0.kind
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Class) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The class itself (counterpart of an instance's identity)
    pub fn identity(&self) -> Class {
        self.clone()
    }

    /// Parent class
    pub fn parent(&self) -> Option<&Class> {
        self.0.parent.as_ref()
    }

    /// Prototype shared by all instances
    pub fn prototype(&self) -> &Object {
        &self.0.prototype
    }

    /// Receiver of class-level calls
    pub fn class_object(&self) -> &Object {
        &self.0.class_object
    }

    /// Metaclass (None for metaclasses)
    pub fn metaclass(&self) -> Option<Class> {
        self.0.meta.clone()
    }

    /// Side members applied to this node land on
    fn installs(&self) -> Side {
        match self.0.kind {
            ClassKind::Meta => Side::Static,
            ClassKind::Ordinary | ClassKind::Mixin => Side::Instance,
        }
    }

    /// Mixins applied to this class or its ancestors, ancestors first
    pub fn mixins(&self) -> Vec<Mixin> {
        let mut all: Vec<Mixin> = Vec::new();
        for class in self.lineage() {
            for mixin in class.0.mixins.read().iter() {
                if !all.iter().any(|m| m.ptr_eq(mixin)) {
                    all.push(mixin.clone());
                }
            }
        }
        all
    }

    /// Whether `mixin` was applied to this class or an ancestor
    pub fn has_mixin(&self, mixin: &Mixin) -> bool {
        self.mixins().iter().any(|m| m.ptr_eq(mixin))
    }

    /// Classes from the root down to `self`
    pub fn lineage(&self) -> Vec<Class> {
        let mut chain = Vec::new();
        let mut current = Some(self.clone());
        while let Some(class) = current {
            current = class.parent().cloned();
            chain.push(class);
        }
        chain.reverse();
        chain
    }

    /// Whether `self` is `other` or derives from it
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if class.ptr_eq(other) {
                return true;
            }
            current = class.parent();
        }
        false
    }

    /// Declared `__name__`, resolved through the metaclass chain
    pub fn name(&self) -> Option<String> {
        let holder = match self.0.kind {
            ClassKind::Meta => &self.0.prototype,
            ClassKind::Ordinary | ClassKind::Mixin => &self.0.class_object,
        };
        match holder.lookup(NAME_MEMBER) {
            Some(Slot::Value(Value::Str(name))) => Some(name.to_string()),
            _ => None,
        }
    }

    /// Declared name or the anonymous marker
    pub fn display_name(&self) -> String {
        self.name()
            .unwrap_or_else(|| settings::current().anonymous_name.clone())
    }

    pub(crate) fn downgrade(&self) -> WeakClass {
        WeakClass(Arc::downgrade(&self.0))
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.0.id)
            .field("kind", &self.0.kind)
            .field("name", &self.name())
            .field("parent", &self.0.parent.as_ref().map(|p| p.id()))
            .finish()
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.kind {
            ClassKind::Meta => write!(f, "[{} Metaclass]", self.display_name()),
            ClassKind::Ordinary | ClassKind::Mixin => write!(f, "[{} Class]", self.display_name()),
        }
    }
}

//! Object model: prototype-chained slot maps
//!
//! Every object owns a slot map and an optional link to the object it
//! delegates to. Classes are built out of the same pieces: a class
//! prototype is an object, the class side of a class is an object whose
//! prototype is the metaclass prototype, and instances are objects whose
//! prototype is their class prototype.

use crate::class::Class;
use crate::error::{ClassError, ClassResult};
use crate::function::Function;
use crate::value::Value;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Global counter for generating unique object IDs
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique object ID
fn generate_object_id() -> u64 {
    NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Getter/setter pair installed in place of a plain value
#[derive(Debug, Clone, Default)]
pub struct Accessor {
    /// Getter; reads fail when absent
    pub get: Option<Function>,
    /// Setter; writes fail when absent
    pub set: Option<Function>,
    /// Whether the accessor shows up in [`Object::keys`]
    pub enumerable: bool,
}

/// A named entry of an object
#[derive(Debug, Clone)]
pub enum Slot {
    /// Plain value
    Value(Value),
    /// Computed accessor
    Accessor(Accessor),
}

/// Heap object (shared handle)
#[derive(Clone)]
pub struct Object(Arc<ObjectNode>);

struct ObjectNode {
    /// Unique object ID
    id: u64,
    /// Object that unresolved reads delegate to
    proto: Option<Object>,
    /// Originating class, for instances
    identity: Option<Class>,
    /// Own slots
    slots: RwLock<FxHashMap<String, Slot>>,
}

impl Object {
    fn build(proto: Option<Object>, identity: Option<Class>) -> Self {
        Object(Arc::new(ObjectNode {
            id: generate_object_id(),
            proto,
            identity,
            slots: RwLock::new(FxHashMap::default()),
        }))
    }

    /// Create an object with no prototype
    pub fn plain() -> Self {
        Self::build(None, None)
    }

    /// Create an object delegating to `proto`
    pub fn inheriting(proto: &Object) -> Self {
        Self::build(Some(proto.clone()), None)
    }

    /// Allocate an instance of `class`
    pub(crate) fn instance(class: &Class) -> Self {
        Self::build(Some(class.prototype().clone()), Some(class.clone()))
    }

    /// Unique id
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Prototype link
    pub fn proto(&self) -> Option<&Object> {
        self.0.proto.as_ref()
    }

    /// Class this instance was created from
    pub fn identity(&self) -> Option<&Class> {
        self.0.identity.as_ref()
    }

    /// Metaclass of the originating class
    pub fn metaclass(&self) -> Option<Class> {
        self.0.identity.as_ref().and_then(|class| class.metaclass())
    }

    /// Own slot, without walking the chain
    pub fn own_slot(&self, name: &str) -> Option<Slot> {
        self.0.slots.read().get(name).cloned()
    }

    /// Whether `name` is an own slot
    pub fn has_own(&self, name: &str) -> bool {
        self.0.slots.read().contains_key(name)
    }

    /// Own enumerable names, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .0
            .slots
            .read()
            .iter()
            .filter(|(_, slot)| match slot {
                Slot::Value(_) => true,
                Slot::Accessor(accessor) => accessor.enumerable,
            })
            .map(|(name, _)| name.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Resolve `name` along the prototype chain
    pub fn lookup(&self, name: &str) -> Option<Slot> {
        let mut current = Some(self);
        while let Some(object) = current {
            if let Some(slot) = object.own_slot(name) {
                return Some(slot);
            }
            current = object.proto();
        }
        None
    }

    /// Read a member with `self` as the receiver
    pub fn get(&self, name: &str) -> ClassResult<Value> {
        self.get_with_receiver(name, &Value::Object(self.clone()))
    }

    /// Read a member, running accessors against `receiver`
    pub(crate) fn get_with_receiver(&self, name: &str, receiver: &Value) -> ClassResult<Value> {
        match self.lookup(name) {
            None => Ok(Value::Undefined),
            Some(Slot::Value(value)) => Ok(value),
            Some(Slot::Accessor(Accessor { get: Some(getter), .. })) => {
                getter.apply(receiver.clone(), &[])
            }
            Some(Slot::Accessor(_)) => Err(ClassError::PropertyNotReadable {
                name: name.to_string(),
            }),
        }
    }

    /// Write a member with `self` as the receiver
    pub fn set(&self, name: &str, value: impl Into<Value>) -> ClassResult<()> {
        self.set_with_receiver(name, value.into(), &Value::Object(self.clone()))
    }

    /// Write a member. An accessor anywhere on the chain intercepts the
    /// write; otherwise the value becomes an own slot of `self`.
    pub(crate) fn set_with_receiver(
        &self,
        name: &str,
        value: Value,
        receiver: &Value,
    ) -> ClassResult<()> {
        match self.lookup(name) {
            Some(Slot::Accessor(Accessor { set: Some(setter), .. })) => {
                setter.apply(receiver.clone(), &[value])?;
                Ok(())
            }
            Some(Slot::Accessor(_)) => Err(ClassError::PropertyNotWritable {
                name: name.to_string(),
            }),
            _ => {
                self.define(name, value);
                Ok(())
            }
        }
    }

    /// Store an own value slot, replacing whatever was there
    pub fn define(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.0
            .slots
            .write()
            .insert(name.into(), Slot::Value(value.into()));
    }

    /// Store an own accessor slot
    pub fn define_accessor(&self, name: impl Into<String>, accessor: Accessor) {
        self.0
            .slots
            .write()
            .insert(name.into(), Slot::Accessor(accessor));
    }

    /// Look up `name` and invoke it with `self` as the receiver
    pub fn call(&self, name: &str, args: &[Value]) -> ClassResult<Value> {
        Value::Object(self.clone()).call(name, args)
    }

    /// Whether `class`'s prototype is on this object's prototype chain
    pub fn is_instance_of(&self, class: &Class) -> bool {
        let target = class.prototype();
        let mut current = self.proto();
        while let Some(object) = current {
            if object.ptr_eq(target) {
                return true;
            }
            current = object.proto();
        }
        false
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.0.id)
            .field("identity", &self.0.identity.as_ref().map(|c| c.id()))
            .field("keys", &self.keys())
            .finish()
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.identity {
            Some(class) => write!(f, "[{}]", class.display_name()),
            None => write!(f, "[object]"),
        }
    }
}

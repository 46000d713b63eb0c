//! Dynamic values
//!
//! [`Value`] is what class members hold, what functions receive and
//! return, and what plays the receiver (`this`) role. Reference variants
//! share their payload through `Arc`; cloning a value never copies an
//! object, a class or a function.

use crate::class::Class;
use crate::error::{ClassError, ClassResult};
use crate::function::Function;
use crate::mixin::Mixin;
use crate::object::Object;
use crate::trigger::AttributeTrigger;
use std::fmt;
use std::sync::Arc;

/// Shared attribute trigger handle
pub type Trigger = Arc<dyn AttributeTrigger>;

/// A dynamically typed value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value (missing member, function without result)
    #[default]
    Undefined,
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// Number
    Number(f64),
    /// Immutable string
    Str(Arc<str>),
    /// Callable
    Function(Function),
    /// Instance or plain object
    Object(Object),
    /// Class (or metaclass)
    Class(Class),
    /// Mixin
    Mixin(Mixin),
    /// Attribute trigger awaiting installation
    Trigger(Trigger),
}

impl Value {
    /// Wrap an attribute trigger so it can be declared as a member
    pub fn trigger(trigger: impl AttributeTrigger + 'static) -> Self {
        Value::Trigger(Arc::new(trigger))
    }

    /// Check for `Undefined`
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Check for `Undefined` or `Null`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Check for a function
    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric payload
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Function payload
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Object payload
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Class payload
    pub fn as_class(&self) -> Option<&Class> {
        match self {
            Value::Class(c) => Some(c),
            _ => None,
        }
    }

    /// Mixin payload
    pub fn as_mixin(&self) -> Option<&Mixin> {
        match self {
            Value::Mixin(m) => Some(m),
            _ => None,
        }
    }

    /// Name of the variant, for messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Function(_) => "function",
            Value::Object(_) => "object",
            Value::Class(_) => "class",
            Value::Mixin(_) => "mixin",
            Value::Trigger(_) => "trigger",
        }
    }

    /// Identity comparison: pointer identity for reference variants,
    /// equality for primitives.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Class(a), Value::Class(b)) => a.ptr_eq(b),
            (Value::Mixin(a), Value::Mixin(b)) => a.ptr_eq(b),
            (Value::Trigger(a), Value::Trigger(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }

    /// Read a member, treating `self` as the receiver.
    ///
    /// Primitives have no members and read as `Undefined`.
    pub fn get(&self, name: &str) -> ClassResult<Value> {
        match self {
            Value::Object(o) => o.get(name),
            Value::Class(c) => c.get(name),
            Value::Mixin(m) => m.object().get(name),
            _ => Ok(Value::Undefined),
        }
    }

    /// Write a member, treating `self` as the receiver
    pub fn set(&self, name: &str, value: impl Into<Value>) -> ClassResult<()> {
        match self {
            Value::Object(o) => o.set(name, value),
            Value::Class(c) => c.set(name, value),
            Value::Mixin(m) => m.object().set(name, value),
            other => Err(ClassError::runtime(format!(
                "cannot set `{}` on {}",
                name,
                other.type_name()
            ))),
        }
    }

    /// Look up `name` and invoke it with `self` as the receiver
    pub fn call(&self, name: &str, args: &[Value]) -> ClassResult<Value> {
        match self.get(name)? {
            Value::Function(f) => f.apply(self.clone(), args),
            _ => Err(ClassError::NotCallable {
                name: name.to_string(),
            }),
        }
    }

    /// Prototype-chain membership test
    pub fn is_instance_of(&self, class: &Class) -> bool {
        match self {
            Value::Object(o) => o.is_instance_of(class),
            Value::Class(c) => c.class_object().is_instance_of(class),
            Value::Mixin(m) => m.object().is_instance_of(class),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Function(func) => write!(f, "{}", func),
            Value::Object(o) => write!(f, "{}", o),
            Value::Class(c) => write!(f, "{}", c),
            Value::Mixin(m) => write!(f, "{}", m),
            Value::Trigger(_) => write!(f, "[AttributeTrigger]"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Class> for Value {
    fn from(c: Class) -> Self {
        Value::Class(c)
    }
}

impl From<Mixin> for Value {
    fn from(m: Mixin) -> Self {
        Value::Mixin(m)
    }
}

impl From<&Mixin> for Value {
    fn from(m: &Mixin) -> Self {
        Value::Mixin(m.clone())
    }
}

impl From<Trigger> for Value {
    fn from(t: Trigger) -> Self {
        Value::Trigger(t)
    }
}

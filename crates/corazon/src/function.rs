//! Functions, call frames and super-call linkage
//!
//! A [`Function`] is either a native body or a *wrapper*. Wrappers are made
//! by the class kernel whenever a function member is installed: they hold
//! the raw function they wrap and the function they override, and on every
//! call they hand the body a [`Frame`] whose [`Super`] is bound to the
//! current receiver.
//!
//! ```rust
//! # use corazon::Function;
//! let speak = Function::new(|frame, _args| {
//!     let inherited = frame.call_super(&[])?;
//!     Ok(format!("loud {}", inherited).into())
//! });
//! ```
//!
//! A [`Super`] is an owned value. Cloning it out of the frame and calling it
//! after the body has returned (from a spawned task, a callback, a timer)
//! still reaches the overridden implementation with the original receiver.

use crate::error::{ClassError, ClassResult};
use crate::value::Value;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Signature of a native function body
pub type NativeFn = dyn Fn(&Frame, &[Value]) -> ClassResult<Value> + Send + Sync;

static NEXT_FUNCTION_ID: AtomicU64 = AtomicU64::new(1);

fn generate_function_id() -> u64 {
    NEXT_FUNCTION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Shared target of `_super` when nothing was overridden
static NOOP: Lazy<Function> = Lazy::new(|| Function::named("noop", |_, _| Ok(Value::Undefined)));

/// Callable value
#[derive(Clone)]
pub struct Function(Arc<FunctionNode>);

struct FunctionNode {
    id: u64,
    name: Option<String>,
    body: Body,
    /// Auxiliary metadata attached to the function
    attributes: RwLock<FxHashMap<String, Value>>,
}

enum Body {
    Native(Arc<NativeFn>),
    Wrapper {
        /// Raw function; never itself a wrapper
        wrapped: Function,
        /// Implementation `_super` resolves to
        overridden: Function,
    },
}

impl Function {
    /// Create an anonymous native function
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&Frame, &[Value]) -> ClassResult<Value> + Send + Sync + 'static,
    {
        Self::build(None, body)
    }

    /// Create a named native function
    pub fn named<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Frame, &[Value]) -> ClassResult<Value> + Send + Sync + 'static,
    {
        Self::build(Some(name.into()), body)
    }

    fn build<F>(name: Option<String>, body: F) -> Self
    where
        F: Fn(&Frame, &[Value]) -> ClassResult<Value> + Send + Sync + 'static,
    {
        Function(Arc::new(FunctionNode {
            id: generate_function_id(),
            name,
            body: Body::Native(Arc::new(body)),
            attributes: RwLock::new(FxHashMap::default()),
        }))
    }

    /// The shared no-op function (returns `Undefined`)
    pub fn noop() -> Function {
        NOOP.clone()
    }

    /// Wrap `function` so that its `_super` resolves to `overridden`.
    ///
    /// Wrappers are unwrapped first: the result wraps a raw function
    /// exactly once. Attributes of `function` are copied to the wrapper.
    pub(crate) fn wrap(function: &Function, overridden: Function, member: &str) -> Function {
        let wrapped = function.unwrapped().clone();
        let attributes = function.0.attributes.read().clone();
        let name = wrapped
            .0
            .name
            .clone()
            .unwrap_or_else(|| member.to_string());

        tracing::trace!(
            member,
            wrapped = wrapped.id(),
            overridden = overridden.id(),
            "wrapping function"
        );

        Function(Arc::new(FunctionNode {
            id: generate_function_id(),
            name: Some(name),
            body: Body::Wrapper {
                wrapped,
                overridden,
            },
            attributes: RwLock::new(attributes),
        }))
    }

    /// Unique id
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Declared name, if any
    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Whether this function is a super-linked wrapper
    pub fn is_wrapper(&self) -> bool {
        matches!(self.0.body, Body::Wrapper { .. })
    }

    /// The raw function behind a wrapper
    pub fn wrapped_function(&self) -> Option<&Function> {
        match &self.0.body {
            Body::Wrapper { wrapped, .. } => Some(wrapped),
            Body::Native(_) => None,
        }
    }

    /// The implementation a wrapper overrides
    pub fn super_function(&self) -> Option<&Function> {
        match &self.0.body {
            Body::Wrapper { overridden, .. } => Some(overridden),
            Body::Native(_) => None,
        }
    }

    /// The raw function: `self` unless `self` is a wrapper
    pub fn unwrapped(&self) -> &Function {
        self.wrapped_function().unwrap_or(self)
    }

    /// Read an attribute
    pub fn attribute(&self, name: &str) -> Option<Value> {
        self.0.attributes.read().get(name).cloned()
    }

    /// Attach an attribute
    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.attributes.write().insert(name.into(), value.into());
    }

    /// Builder form of [`Function::set_attribute`]
    pub fn with_attribute(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Attribute names, sorted
    pub fn attribute_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.attributes.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Call without a receiver (`this` is `Undefined`)
    pub fn call(&self, args: &[Value]) -> ClassResult<Value> {
        self.apply(Value::Undefined, args)
    }

    /// Call with an explicit receiver
    pub fn apply(&self, this: Value, args: &[Value]) -> ClassResult<Value> {
        match &self.0.body {
            Body::Native(body) => {
                let frame = Frame {
                    super_: Super {
                        overridden: Function::noop(),
                        receiver: this.clone(),
                    },
                    this,
                };
                body(&frame, args)
            }
            Body::Wrapper {
                wrapped,
                overridden,
            } => {
                let frame = Frame {
                    super_: Super {
                        overridden: overridden.clone(),
                        receiver: this.clone(),
                    },
                    this,
                };
                wrapped.invoke(&frame, args)
            }
        }
    }

    fn invoke(&self, frame: &Frame, args: &[Value]) -> ClassResult<Value> {
        match &self.0.body {
            Body::Native(body) => body(frame, args),
            // Unreachable through `wrap`, which always stores a raw function
            Body::Wrapper { .. } => self.apply(frame.this.clone(), args),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .field("wrapper", &self.is_wrapper())
            .finish()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.name {
            Some(name) => write!(f, "[Function {}]", name),
            None => write!(f, "[Function]"),
        }
    }
}

/// Call context handed to native bodies
#[derive(Debug, Clone)]
pub struct Frame {
    this: Value,
    super_: Super,
}

impl Frame {
    /// The receiver
    pub fn this(&self) -> &Value {
        &self.this
    }

    /// `_super`, bound to the receiver
    pub fn super_(&self) -> &Super {
        &self.super_
    }

    /// Shorthand for `self.super_().call(args)`
    pub fn call_super(&self, args: &[Value]) -> ClassResult<Value> {
        self.super_.call(args)
    }

    /// Read a member of the receiver
    pub fn get(&self, name: &str) -> ClassResult<Value> {
        self.this.get(name)
    }

    /// Write a member of the receiver
    pub fn set(&self, name: &str, value: impl Into<Value>) -> ClassResult<()> {
        self.this.set(name, value)
    }

    /// Call a member of the receiver
    pub fn call(&self, name: &str, args: &[Value]) -> ClassResult<Value> {
        self.this.call(name, args)
    }
}

/// `_super`: the overridden implementation bound to a receiver
#[derive(Debug, Clone)]
pub struct Super {
    overridden: Function,
    receiver: Value,
}

impl Super {
    /// Invoke the overridden implementation on the bound receiver
    pub fn call(&self, args: &[Value]) -> ClassResult<Value> {
        tracing::trace!(overridden = self.overridden.id(), "super call");
        self.overridden.apply(self.receiver.clone(), args)
    }

    /// Invoke with an explicit receiver, which must be the bound one.
    ///
    /// Use [`Super::unbound`] to run the overridden implementation on a
    /// different receiver.
    pub fn apply(&self, this: &Value, args: &[Value]) -> ClassResult<Value> {
        if !this.same(&self.receiver) {
            return Err(ClassError::SuperRebound);
        }
        self.call(args)
    }

    /// The raw overridden function, free to be applied to any receiver
    pub fn unbound(&self) -> &Function {
        &self.overridden
    }

    /// The bound receiver
    pub fn receiver(&self) -> &Value {
        &self.receiver
    }
}

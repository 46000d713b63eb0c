//! Property: the built-in attribute trigger for accessors
//!
//! ```rust
//! # use corazon::{Bundle, Class, Property, Value};
//! # fn main() -> Result<(), corazon::ClassError> {
//! let dog = Class::base().extend(
//!     Bundle::new()
//!         .method("init", |frame, _| { frame.set("_type", "canine")?; Ok(Value::Undefined) })
//!         .with("type", Property::new()),
//! )?;
//! assert_eq!(dog.create(&[])?.get("type")?, Value::from("canine"));
//! # Ok(())
//! # }
//! ```
//!
//! Without options a property is readable and not writable, and reads the
//! backing field `_<name>`. Reads of a non-readable property and writes to
//! a non-writable one fail when they happen, not when the class is defined.

use crate::error::{ClassError, ClassResult};
use crate::function::Function;
use crate::object::{Accessor, Object};
use crate::settings;
use crate::trigger::{AttributeTrigger, TriggerDetails};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Property options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyOptions {
    /// Generate a getter when none is given (default: true)
    pub readable: bool,
    /// Generate a setter when none is given (default: false)
    pub writable: bool,
    /// Backing field (default: backing prefix + member name)
    pub property: Option<String>,
}

impl Default for PropertyOptions {
    fn default() -> Self {
        Self {
            readable: true,
            writable: false,
            property: None,
        }
    }
}

impl PropertyOptions {
    /// Set `readable`
    pub fn readable(mut self, readable: bool) -> Self {
        self.readable = readable;
        self
    }

    /// Set `writable`
    pub fn writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    /// Set the backing field
    pub fn property(mut self, field: impl Into<String>) -> Self {
        self.property = Some(field.into());
        self
    }

    /// Read options from the `readable`, `writable` and `property` slots of
    /// an object; absent slots keep their defaults.
    pub fn from_object(object: &Object) -> ClassResult<Self> {
        let mut options = Self::default();
        if let Some(readable) = flag(object, "readable")? {
            options.readable = readable;
        }
        if let Some(writable) = flag(object, "writable")? {
            options.writable = writable;
        }
        match object.get("property")? {
            Value::Undefined => {}
            Value::Str(field) => options.property = Some(field.to_string()),
            other => {
                return Err(ClassError::runtime(format!(
                    "property option `property` must be a string, got {}",
                    other.type_name()
                )))
            }
        }
        Ok(options)
    }
}

fn flag(object: &Object, name: &str) -> ClassResult<Option<bool>> {
    match object.get(name)? {
        Value::Undefined => Ok(None),
        Value::Bool(b) => Ok(Some(b)),
        other => Err(ClassError::runtime(format!(
            "property option `{}` must be a boolean, got {}",
            name,
            other.type_name()
        ))),
    }
}

/// Options resolved for one member, handed to accessor generators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    /// Member name
    pub name: String,
    /// Whether a getter is generated when none is given
    pub readable: bool,
    /// Whether a setter is generated when none is given
    pub writable: bool,
    /// Backing field
    pub property: String,
}

/// Generators for the accessors a [`Property`] installs when no explicit
/// getter or setter was given.
///
/// Both methods have defaults that read and write the backing field
/// `opts.property` on the receiver. Property flavours override one or
/// both and are attached with [`Property::accessors`].
pub trait PropertyAccessors: fmt::Debug + Send + Sync {
    /// Build the generated getter
    fn getter(&self, opts: &ResolvedOptions) -> Function {
        let field = opts.property.clone();
        Function::named(opts.name.clone(), move |frame, _| frame.get(&field))
    }

    /// Build the generated setter
    fn setter(&self, opts: &ResolvedOptions) -> Function {
        let field = opts.property.clone();
        Function::named(opts.name.clone(), move |frame, args| {
            let value = args.first().cloned().unwrap_or_default();
            frame.set(&field, value)?;
            Ok(Value::Undefined)
        })
    }
}

/// Backing-field accessors
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldAccessors;

impl PropertyAccessors for FieldAccessors {}

/// Accessor-generating trigger
#[derive(Debug, Clone)]
pub struct Property {
    get: Option<Function>,
    set: Option<Function>,
    options: PropertyOptions,
    accessors: Arc<dyn PropertyAccessors>,
}

impl Default for Property {
    fn default() -> Self {
        Self {
            get: None,
            set: None,
            options: PropertyOptions::default(),
            accessors: Arc::new(FieldAccessors),
        }
    }
}

impl Property {
    /// Property with default options and generated accessors
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `getter` instead of a generated one
    pub fn getter(mut self, getter: Function) -> Self {
        self.get = Some(getter);
        self
    }

    /// Use `setter` instead of a generated one
    pub fn setter(mut self, setter: Function) -> Self {
        self.set = Some(setter);
        self
    }

    /// Replace the options
    pub fn options(mut self, options: PropertyOptions) -> Self {
        self.options = options;
        self
    }

    /// Generate missing accessors with `accessors`
    pub fn accessors(mut self, accessors: impl PropertyAccessors + 'static) -> Self {
        self.accessors = Arc::new(accessors);
        self
    }

    /// Build from positional arguments: an optional getter, an optional
    /// setter (each a function or `Undefined`), then an optional options
    /// object.
    pub fn from_args(args: &[Value]) -> ClassResult<Self> {
        let mut rest = args.iter().peekable();
        let mut accessor = || match rest.peek() {
            Some(Value::Undefined) => rest.next().and(None),
            Some(Value::Function(_)) => rest.next().and_then(Value::as_function).cloned(),
            _ => None,
        };
        let get = accessor();
        let set = accessor();

        let options = match rest.next() {
            None | Some(Value::Undefined) => PropertyOptions::default(),
            Some(Value::Object(object)) => PropertyOptions::from_object(object)?,
            Some(other) => {
                return Err(ClassError::runtime(format!(
                    "property options must be an object, got {}",
                    other.type_name()
                )))
            }
        };

        Ok(Self {
            get,
            set,
            options,
            ..Self::default()
        })
    }

    /// Backing field used for member `name`
    pub fn backing_field(&self, name: &str) -> String {
        self.options
            .property
            .clone()
            .unwrap_or_else(|| format!("{}{}", settings::current().backing_prefix, name))
    }

    /// Options as seen by the accessor generators for member `name`
    pub fn resolve(&self, name: &str) -> ResolvedOptions {
        ResolvedOptions {
            name: name.to_string(),
            readable: self.options.readable,
            writable: self.options.writable,
            property: self.backing_field(name),
        }
    }
}

impl AttributeTrigger for Property {
    fn invoke(&self, name: &str, reopen: bool, details: &TriggerDetails<'_>) -> ClassResult<()> {
        let opts = self.resolve(name);
        let get = match &self.get {
            Some(getter) => Some(getter.clone()),
            None if opts.readable => Some(self.accessors.getter(&opts)),
            None => None,
        };
        let set = match &self.set {
            Some(setter) => Some(setter.clone()),
            None if opts.writable => Some(self.accessors.setter(&opts)),
            None => None,
        };

        tracing::debug!(
            member = name,
            field = opts.property.as_str(),
            readable = get.is_some(),
            writable = set.is_some(),
            reopen,
            "defining property"
        );

        details.prototype.define_accessor(
            name,
            Accessor {
                get,
                set,
                enumerable: true,
            },
        );
        Ok(())
    }
}

impl From<Property> for Value {
    fn from(property: Property) -> Self {
        Value::trigger(property)
    }
}

/// Build a property trigger from positional arguments, ready to declare as
/// a member. See [`Property::from_args`].
pub fn property(args: &[Value]) -> ClassResult<Value> {
    Property::from_args(args).map(Value::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_getter_only() {
        let getter = Function::new(|_, _| Ok(Value::from(1)));
        let property = Property::from_args(&[getter.clone().into()]).unwrap();
        assert!(property.get.as_ref().unwrap().ptr_eq(&getter));
        assert!(property.set.is_none());
        assert_eq!(property.options, PropertyOptions::default());
    }

    #[test]
    fn test_positional_setter_after_undefined() {
        let setter = Function::new(|_, _| Ok(Value::Undefined));
        let property = Property::from_args(&[Value::Undefined, setter.clone().into()]).unwrap();
        assert!(property.get.is_none());
        assert!(property.set.as_ref().unwrap().ptr_eq(&setter));
    }

    #[test]
    fn test_positional_options_only() {
        let options = Object::plain();
        options.set("writable", true).unwrap();
        options.set("property", "_kind").unwrap();

        let property = Property::from_args(&[options.into()]).unwrap();
        assert!(property.get.is_none());
        assert!(property.options.readable);
        assert!(property.options.writable);
        assert_eq!(property.backing_field("type"), "_kind");
    }

    #[test]
    fn test_rejects_non_object_options() {
        let result = Property::from_args(&[Value::from("nope")]);
        assert!(matches!(result, Err(ClassError::Runtime(_))));
    }

    #[test]
    fn test_rejects_non_boolean_flag() {
        let options = Object::plain();
        options.set("readable", "yes").unwrap();
        assert!(PropertyOptions::from_object(&options).is_err());
    }

    #[test]
    fn test_resolve_carries_member_name() {
        let property = Property::new().options(PropertyOptions::default().writable(true));
        assert_eq!(
            property.resolve("type"),
            ResolvedOptions {
                name: "type".to_string(),
                readable: true,
                writable: true,
                property: "_type".to_string(),
            }
        );
    }

    #[test]
    fn test_default_backing_field() {
        assert_eq!(Property::new().backing_field("type"), "_type");
    }
}

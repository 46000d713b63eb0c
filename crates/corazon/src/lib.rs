//! Corazon: a class kernel for dynamic objects
//!
//! This crate provides:
//! - **Classes** with single inheritance, in-place reopening and a parallel
//!   metaclass hierarchy for class-level members (`class` module)
//! - **Super calls**: every installed function can reach the implementation
//!   it overrides, synchronously or from a deferred continuation
//!   (`function` module)
//! - **Mixins**: immutable member bundles composed from other mixins and
//!   flattened into a class's mixin history (`mixin` module)
//! - **Attribute triggers**: members that install themselves, with
//!   [`Property`] as the built-in accessor generator (`trigger`, `property`)
//!
//! # Example
//!
//! ```rust
//! use corazon::{Bundle, Class, Definition, Value};
//!
//! # fn main() -> Result<(), corazon::ClassError> {
//! let animal = Class::base().extend(
//!     Bundle::new().method("speak", |_, _| Ok(Value::from("speaking"))),
//! )?;
//! let dog = animal.extend(
//!     Definition::new()
//!         .include(Bundle::new().method("speak", |frame, _| frame.call_super(&[])))
//!         .named("Dog"),
//! )?;
//!
//! let milo = dog.create(&[])?;
//! assert_eq!(milo.call("speak", &[])?, Value::from("speaking"));
//! assert_eq!(milo.to_string(), "[Dog]");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bundle;
pub mod class;
pub mod error;
pub mod function;
pub mod logging;
pub mod mixin;
pub mod object;
pub mod property;
pub mod registry;
pub mod settings;
pub mod trigger;
pub mod value;

pub use bundle::{Bundle, Definition, Part, NAME_MEMBER};
pub use class::{Class, ClassKind, Side, INIT_MEMBER, NEW_MEMBER};
pub use error::{ClassError, ClassResult};
pub use function::{Frame, Function, NativeFn, Super};
pub use mixin::Mixin;
pub use object::{Accessor, Object, Slot};
pub use property::{
    property, FieldAccessors, Property, PropertyAccessors, PropertyOptions, ResolvedOptions,
};
pub use registry::{ClassId, ClassRegistry};
pub use settings::Settings;
pub use trigger::{AttributeTrigger, BaseTrigger, TriggerDetails};
pub use value::{Trigger, Value};

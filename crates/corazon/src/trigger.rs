//! Attribute triggers
//!
//! A member whose value is a trigger is not stored on the class. Instead
//! the kernel calls [`AttributeTrigger::invoke`] once, while the definition
//! is being applied, and the trigger installs whatever real member it
//! wants through the [`TriggerDetails`] it receives.
//! [`Property`](crate::Property) is the built-in trigger.

use crate::class::{Class, Side};
use crate::error::{ClassError, ClassResult};
use crate::object::Object;
use std::fmt;

/// Where a trigger is being installed
#[derive(Debug, Clone, Copy)]
pub struct TriggerDetails<'a> {
    /// Class node that owns `prototype` (the metaclass for class-side parts)
    pub class: &'a Class,
    /// Object members are defined onto
    pub prototype: &'a Object,
    /// Side of the class being defined
    pub side: Side,
}

/// Installation hook for a declared member.
///
/// Implementors must override [`invoke`](AttributeTrigger::invoke); the
/// provided body fails with [`ClassError::TriggerNotImplemented`].
pub trait AttributeTrigger: fmt::Debug + Send + Sync {
    /// Install the member `name`.
    ///
    /// Called exactly once per member per definition pass, synchronously.
    /// `reopen` is `false` during `extend` and `true` during `reopen` and
    /// `reopen_class`.
    fn invoke(&self, name: &str, reopen: bool, details: &TriggerDetails<'_>) -> ClassResult<()> {
        let _ = (reopen, details);
        Err(ClassError::TriggerNotImplemented {
            name: name.to_string(),
        })
    }
}

/// Trigger that does not override `invoke`; declaring it fails
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseTrigger;

impl AttributeTrigger for BaseTrigger {}

//! Error types for the class kernel

/// Errors raised while defining classes or dispatching members.
///
/// Every variant represents misuse of the composition API. The kernel
/// never retries or swallows them; they surface to the caller at the
/// point where the misuse happened.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassError {
    /// A bound `_super` was applied to a receiver other than its own
    #[error("cannot change `this` via bound `_super`; use `_super.unbound` to rebind")]
    SuperRebound,

    /// An attribute trigger reached installation without overriding `invoke`
    #[error("`invoke` must be overridden by a subclass of AttributeTrigger (member `{name}`)")]
    TriggerNotImplemented {
        /// Member name the trigger was declared under
        name: String,
    },

    /// `extend` was called on the mixin class
    #[error("cannot extend mixin")]
    CannotExtendMixin,

    /// Read of an accessor that has no getter
    #[error("cannot get property `{name}`: not readable (accessor has only a setter)")]
    PropertyNotReadable {
        /// Accessor name
        name: String,
    },

    /// Write of an accessor that has no setter
    #[error("cannot set property `{name}`: not writable (accessor has only a getter)")]
    PropertyNotWritable {
        /// Accessor name
        name: String,
    },

    /// Call of a member that does not hold a function
    #[error("`{name}` is not a function")]
    NotCallable {
        /// Member name
        name: String,
    },

    /// Error raised from inside a native member body
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Invalid or repeated settings installation
    #[error("Settings error: {0}")]
    Settings(String),
}

impl ClassError {
    /// Shorthand for [`ClassError::Runtime`]
    pub fn runtime(message: impl Into<String>) -> Self {
        ClassError::Runtime(message.into())
    }
}

/// Result alias used throughout the crate
pub type ClassResult<T> = Result<T, ClassError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_misuse() {
        assert!(ClassError::SuperRebound
            .to_string()
            .contains("cannot change `this`"));
        assert!(ClassError::SuperRebound
            .to_string()
            .contains("_super.unbound"));
        assert_eq!(ClassError::CannotExtendMixin.to_string(), "cannot extend mixin");

        let err = ClassError::PropertyNotWritable {
            name: "type".to_string(),
        };
        assert!(err.to_string().starts_with("cannot set property `type`"));
    }
}

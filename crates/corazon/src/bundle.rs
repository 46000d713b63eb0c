//! Member bundles and class definitions

use crate::error::ClassResult;
use crate::function::{Frame, Function};
use crate::mixin::Mixin;
use crate::value::Value;

/// Reserved class-level member holding the declared class name
pub const NAME_MEMBER: &str = "__name__";

/// Ordered set of named members
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    members: Vec<(String, Value)>,
}

impl Bundle {
    /// Create an empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member. Redeclaring a name replaces the value but keeps the
    /// position of the first declaration.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add a native method
    pub fn method<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Frame, &[Value]) -> ClassResult<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let function = Function::named(name.clone(), body);
        self.with(name, function)
    }

    /// In-place form of [`Bundle::with`]
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.members.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.members.push((name, value)),
        }
    }

    /// Member by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.members
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Member names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|(name, _)| name.as_str())
    }

    /// Members in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.members.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the bundle declares nothing
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Bundle {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bundle = Bundle::new();
        for (name, value) in iter {
            bundle.insert(name, value);
        }
        bundle
    }
}

/// One element of a definition: plain members or a mixin
#[derive(Debug, Clone)]
pub enum Part {
    /// Plain members
    Members(Bundle),
    /// Mixin, flattened into the target's mixin history
    Mixin(Mixin),
}

impl From<Bundle> for Part {
    fn from(bundle: Bundle) -> Self {
        Part::Members(bundle)
    }
}

impl From<Mixin> for Part {
    fn from(mixin: Mixin) -> Self {
        Part::Mixin(mixin)
    }
}

impl From<&Mixin> for Part {
    fn from(mixin: &Mixin) -> Self {
        Part::Mixin(mixin.clone())
    }
}

/// Everything a class definition or reopen applies.
///
/// Instance parts land on the class prototype, static parts on the
/// metaclass prototype. The two lists are kept apart explicitly; nothing is
/// inferred from position.
#[derive(Debug, Clone, Default)]
pub struct Definition {
    instance: Vec<Part>,
    statics: Vec<Part>,
}

impl Definition {
    /// Empty definition
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instance-side part
    pub fn include(mut self, part: impl Into<Part>) -> Self {
        self.instance.push(part.into());
        self
    }

    /// Append a class-side part
    pub fn statics(mut self, part: impl Into<Part>) -> Self {
        self.statics.push(part.into());
        self
    }

    /// Declare the class name (class-side `__name__`)
    pub fn named(self, name: impl Into<String>) -> Self {
        self.statics(Bundle::new().with(NAME_MEMBER, name.into()))
    }

    /// Instance-side parts in order
    pub fn instance_parts(&self) -> &[Part] {
        &self.instance
    }

    /// Class-side parts in order
    pub fn static_parts(&self) -> &[Part] {
        &self.statics
    }

    pub(crate) fn into_parts(self) -> (Vec<Part>, Vec<Part>) {
        (self.instance, self.statics)
    }
}

impl From<Bundle> for Definition {
    fn from(bundle: Bundle) -> Self {
        Definition::new().include(bundle)
    }
}

impl From<Mixin> for Definition {
    fn from(mixin: Mixin) -> Self {
        Definition::new().include(mixin)
    }
}

impl From<&Mixin> for Definition {
    fn from(mixin: &Mixin) -> Self {
        Definition::new().include(mixin)
    }
}

impl From<Part> for Definition {
    fn from(part: Part) -> Self {
        Definition::new().include(part)
    }
}

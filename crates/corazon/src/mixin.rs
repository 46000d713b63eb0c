//! Mixins: reusable, immutable member bundles
//!
//! A mixin is built from plain bundles and other mixins. Its *flattened*
//! sequence lists every sub-mixin it was composed from, left to right,
//! without duplicates, followed by the mixin itself. Applying a mixin to a
//! class applies the direct members of each entry of that sequence in
//! order, so a member of a later mixin can reach an earlier one (or the
//! class's own earlier definition) through `_super`.
//!
//! Every mixin is an instance of [`Mixin::class`], which refuses
//! [`Class::extend`].

use crate::bundle::{Bundle, Part, NAME_MEMBER};
use crate::class::{Class, ClassKind};
use crate::object::Object;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

static MIXIN_CLASS: Lazy<Class> = Lazy::new(|| {
    let class = Class::base().derive(ClassKind::Mixin);
    if let Some(meta) = class.metaclass() {
        meta.prototype().define(NAME_MEMBER, "Mixin");
    }
    class
});

/// Shared handle to a mixin
#[derive(Clone)]
pub struct Mixin(Arc<MixinNode>);

struct MixinNode {
    /// Instance of the mixin class; own slots mirror `members`
    object: Object,
    /// Direct members
    members: Bundle,
    /// Flattened sub-mixins, without this mixin
    ancestry: Vec<Mixin>,
}

impl Mixin {
    /// The mixin class
    pub fn class() -> Class {
        MIXIN_CLASS.clone()
    }

    /// Compose a mixin from bundles and other mixins.
    ///
    /// Sub-mixins contribute their flattened sequences, duplicates elided.
    /// The direct members are the last plain bundle; earlier plain bundles
    /// are discarded.
    pub fn create<I, P>(parts: I) -> Mixin
    where
        I: IntoIterator<Item = P>,
        P: Into<Part>,
    {
        let mut ancestry: Vec<Mixin> = Vec::new();
        let mut members: Option<Bundle> = None;
        let mut discarded = 0usize;

        for part in parts {
            match part.into() {
                Part::Mixin(mixin) => {
                    for sub in mixin.flattened() {
                        if !ancestry.iter().any(|known| known.ptr_eq(&sub)) {
                            ancestry.push(sub);
                        }
                    }
                }
                Part::Members(bundle) => {
                    if members.replace(bundle).is_some() {
                        discarded += 1;
                    }
                }
            }
        }

        if discarded > 0 {
            tracing::warn!(discarded, "mixin keeps only its last plain bundle");
        }

        let members = members.unwrap_or_default();
        let object = Object::instance(&MIXIN_CLASS);
        for (name, value) in members.iter() {
            object.define(name, value.clone());
        }

        let mixin = Mixin(Arc::new(MixinNode {
            object,
            members,
            ancestry,
        }));
        tracing::debug!(
            mixin = mixin.id(),
            ancestry = mixin.0.ancestry.len(),
            "mixin created"
        );
        mixin
    }

    /// Unique id (the id of the backing object)
    pub fn id(&self) -> u64 {
        self.0.object.id()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Mixin) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Backing instance of the mixin class
    pub fn object(&self) -> &Object {
        &self.0.object
    }

    /// Direct members
    pub fn members(&self) -> &Bundle {
        &self.0.members
    }

    /// Sub-mixins this mixin was composed from, flattened
    pub fn ancestry(&self) -> &[Mixin] {
        &self.0.ancestry
    }

    /// Ancestry followed by the mixin itself
    pub fn flattened(&self) -> Vec<Mixin> {
        let mut all = self.0.ancestry.clone();
        all.push(self.clone());
        all
    }

    /// Whether `other` is this mixin or one it was composed from
    pub fn includes(&self, other: &Mixin) -> bool {
        self.ptr_eq(other) || self.0.ancestry.iter().any(|m| m.ptr_eq(other))
    }
}

impl fmt::Debug for Mixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mixin")
            .field("id", &self.id())
            .field("members", &self.0.members.names().collect::<Vec<_>>())
            .field(
                "ancestry",
                &self.0.ancestry.iter().map(Mixin::id).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl fmt::Display for Mixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.object)
    }
}

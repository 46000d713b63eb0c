//! Class registry: every class and metaclass, addressed by id
//!
//! The registry only holds weak handles. A class that nothing references
//! any more is reclaimed; its id is never reused and resolves to `None`.
//! Dead entries are swept when the table has doubled since the last sweep,
//! so storage stays proportional to the live classes.

use crate::class::{Class, WeakClass};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Class identifier
pub type ClassId = usize;

/// Table size below which no sweep happens
const MIN_SWEEP_THRESHOLD: usize = 64;

/// Process-wide registry
static REGISTRY: Lazy<RwLock<ClassRegistry>> = Lazy::new(|| RwLock::new(ClassRegistry::new()));

/// Class registry
#[derive(Debug)]
pub struct ClassRegistry {
    /// Classes indexed by ID
    classes: FxHashMap<ClassId, WeakClass>,
    /// Next ID to hand out
    next_id: ClassId,
    /// Table size that triggers the next sweep
    sweep_at: usize,
}

impl ClassRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            classes: FxHashMap::default(),
            next_id: 0,
            sweep_at: MIN_SWEEP_THRESHOLD,
        }
    }

    /// Register a new class
    pub fn register_class(&mut self, class: &Class) -> ClassId {
        let id = class.id();
        debug_assert_eq!(id, self.next_id);
        self.next_id = self.next_id.max(id + 1);

        if self.classes.len() >= self.sweep_at {
            self.sweep();
        }
        self.classes.insert(id, class.downgrade());
        id
    }

    /// Drop entries whose class was reclaimed
    fn sweep(&mut self) {
        let before = self.classes.len();
        self.classes.retain(|_, weak| weak.is_alive());
        self.sweep_at = (self.classes.len() * 2).max(MIN_SWEEP_THRESHOLD);
        tracing::trace!(
            before,
            after = self.classes.len(),
            "swept class registry"
        );
    }

    /// Get class by ID
    pub fn get_class(&self, id: ClassId) -> Option<Class> {
        self.classes.get(&id).and_then(WeakClass::upgrade)
    }

    /// Get a live class by declared name
    pub fn get_class_by_name(&self, name: &str) -> Option<Class> {
        self.iter()
            .map(|(_, class)| class)
            .find(|class| class.name().as_deref() == Some(name))
    }

    /// Get next available class ID
    pub fn next_class_id(&self) -> ClassId {
        self.next_id
    }

    /// Number of classes still alive
    pub fn live_count(&self) -> usize {
        self.classes.values().filter(|weak| weak.is_alive()).count()
    }

    /// Number of entries held, live or not yet swept
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the registry holds no entries
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterate over all live classes with their IDs
    pub fn iter(&self) -> impl Iterator<Item = (ClassId, Class)> + '_ {
        self.classes
            .iter()
            .filter_map(|(&id, weak)| weak.upgrade().map(|class| (id, class)))
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `f` with exclusive access to the process-wide registry
pub(crate) fn with_registry_mut<R>(f: impl FnOnce(&mut ClassRegistry) -> R) -> R {
    f(&mut REGISTRY.write())
}

/// Resolve a class id
pub fn lookup(id: ClassId) -> Option<Class> {
    REGISTRY.read().get_class(id)
}

/// Find a live class by declared name
pub fn find(name: &str) -> Option<Class> {
    REGISTRY.read().get_class_by_name(name)
}

/// Number of live classes
pub fn live_count() -> usize {
    REGISTRY.read().live_count()
}

/// Number of entries the process-wide registry holds
pub fn len() -> usize {
    REGISTRY.read().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::Definition;

    #[test]
    fn test_registered_classes_resolve_by_id() {
        let class = Class::base().extend(Definition::new()).unwrap();
        let resolved = lookup(class.id()).unwrap();
        assert!(resolved.ptr_eq(&class));
    }

    #[test]
    fn test_metaclass_is_registered() {
        let class = Class::base().extend(Definition::new()).unwrap();
        let meta = class.metaclass().unwrap();
        assert!(lookup(meta.id()).unwrap().ptr_eq(&meta));
    }

    #[test]
    fn test_get_class_by_name() {
        let class = Class::base()
            .extend(Definition::new().named("RegistryPoint"))
            .unwrap();
        let found = find("RegistryPoint").unwrap();
        assert!(found.ptr_eq(&class));
    }

    #[test]
    fn test_dropped_classes_are_released() {
        let id = {
            let class = Class::base().extend(Definition::new()).unwrap();
            class.id()
        };
        assert!(lookup(id).is_none());
    }

    #[test]
    fn test_storage_stays_bounded_as_classes_drop() {
        for _ in 0..10_000 {
            let class = Class::base().extend(Definition::new()).unwrap();
            drop(class);
        }
        let last = Class::base().extend(Definition::new()).unwrap();
        assert!(last.id() >= 20_000);
        assert!(len() < 2_000, "registry holds {} entries", len());
    }

    #[test]
    fn test_next_class_id() {
        let registry = ClassRegistry::new();
        assert_eq!(registry.next_class_id(), 0);
        assert_eq!(registry.live_count(), 0);
        assert!(registry.get_class(0).is_none());
        assert!(registry.is_empty());
    }
}

//! Validated parameter store with atomic snapshot publication.
//!
//! [`ParameterStore`] owns the parameter definitions and the current
//! [`ParameterSnapshot`]. Updates are validated as a whole before anything
//! is published; a successful update swaps in a new `Arc<ParameterSnapshot>`
//! via `ArcSwap`, so the render thread always loads a complete snapshot
//! without taking a lock.
//!
//! # Thread Safety
//!
//! - **Definitions**: `Arc<BTreeMap>`: read-only after construction.
//! - **Current snapshot**: `ArcSwap::load_full()`: wait-free reads.
//! - **Writers**: serialized by a `Mutex` so read-modify-write is atomic.
//! - **Subscribers**: `crossbeam-channel` senders behind a `Mutex`, pruned
//!   when their receiver is dropped.

use crate::error::ConfigError;
use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use hiss_core::{ParamValue, ParameterDefinition, ParameterSnapshot, ValidationError};
use hiss_registry::ProcessorRegistry;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

/// Notifications buffered per subscriber before new ones are dropped.
pub const SUBSCRIBER_CAPACITY: usize = 64;

/// Lock-free handle to the store's current snapshot.
///
/// Cheap to clone and `Send + Sync`; the render thread holds one of these
/// instead of the store itself.
#[derive(Clone)]
pub struct SnapshotReader {
    current: Arc<ArcSwap<ParameterSnapshot>>,
}

impl SnapshotReader {
    /// Load the current snapshot (wait-free).
    pub fn load(&self) -> Arc<ParameterSnapshot> {
        self.current.load_full()
    }
}

impl std::fmt::Debug for SnapshotReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotReader")
            .field("params", &self.current.load().len())
            .finish()
    }
}

/// Owner of parameter definitions and the current snapshot.
///
/// # Example
///
/// ```rust
/// use hiss_config::ParameterStore;
/// use hiss_core::{ParameterDefinition, ParamValue};
///
/// let store = ParameterStore::new([
///     ParameterDefinition::cutoff(),
///     ParameterDefinition::poles(),
/// ])
/// .unwrap();
///
/// let updates = store.subscribe();
/// store.update([("cutoff", ParamValue::Float(0.2))]).unwrap();
/// assert_eq!(updates.recv().unwrap().float("cutoff", 0.0), 0.2);
///
/// // Rejected as a whole: cutoff keeps its value.
/// let before = store.snapshot();
/// assert!(store
///     .update([("cutoff", ParamValue::Float(0.9)), ("poles", ParamValue::Int(5))])
///     .is_err());
/// assert_eq!(store.snapshot(), before);
/// ```
pub struct ParameterStore {
    definitions: Arc<BTreeMap<&'static str, ParameterDefinition>>,
    current: Arc<ArcSwap<ParameterSnapshot>>,
    subscribers: Mutex<Vec<Sender<Arc<ParameterSnapshot>>>>,
    write: Mutex<()>,
}

impl ParameterStore {
    /// Create a store from definitions, starting at their defaults.
    ///
    /// Identical definitions under one name merge. Differing definitions
    /// under one name are a [`ConfigError::ConflictingParameter`]; a
    /// definition failing its own checks is a [`ConfigError::Validation`].
    pub fn new(
        definitions: impl IntoIterator<Item = ParameterDefinition>,
    ) -> Result<Self, ConfigError> {
        let mut table = BTreeMap::new();
        for def in definitions {
            def.check()?;
            match table.entry(def.name) {
                Entry::Vacant(slot) => {
                    slot.insert(def);
                }
                Entry::Occupied(existing) if *existing.get() == def => {}
                Entry::Occupied(_) => {
                    return Err(ConfigError::ConflictingParameter(def.name.to_string()));
                }
            }
        }

        let defaults = ParameterSnapshot::from_defaults(table.values());
        tracing::debug!(params = table.len(), "parameter store created");
        Ok(Self {
            definitions: Arc::new(table),
            current: Arc::new(ArcSwap::from_pointee(defaults)),
            subscribers: Mutex::new(Vec::new()),
            write: Mutex::new(()),
        })
    }

    /// Create a store covering every parameter of every registered processor.
    ///
    /// Switching chains never changes the schema, so a snapshot stays valid
    /// for any chain the registry can build.
    pub fn from_registry(registry: &ProcessorRegistry) -> Result<Self, ConfigError> {
        Self::new(registry.all_parameters().cloned())
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<ParameterSnapshot> {
        self.current.load_full()
    }

    /// Lock-free handle for the render thread.
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            current: Arc::clone(&self.current),
        }
    }

    /// Definition of one parameter.
    pub fn definition(&self, name: &str) -> Option<&ParameterDefinition> {
        self.definitions.get(name)
    }

    /// All definitions, ordered by name.
    pub fn definitions(&self) -> impl Iterator<Item = &ParameterDefinition> {
        self.definitions.values()
    }

    /// Number of defined parameters.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether no parameters are defined.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Receive the full snapshot after every successful update.
    ///
    /// Dropping the receiver unsubscribes. A subscriber that falls
    /// [`SUBSCRIBER_CAPACITY`] notifications behind misses newer ones until
    /// it catches up.
    pub fn subscribe(&self) -> Receiver<Arc<ParameterSnapshot>> {
        let (tx, rx) = bounded(SUBSCRIBER_CAPACITY);
        self.subscribers.lock().push(tx);
        rx
    }

    /// Validate and apply `changes` atomically.
    ///
    /// Every change is validated before anything is published. If any fails,
    /// nothing is applied, the previous snapshot stays current, and all
    /// failures are returned together. On success the new snapshot is
    /// published, sent to subscribers, and returned.
    pub fn update<K: Into<String>>(
        &self,
        changes: impl IntoIterator<Item = (K, ParamValue)>,
    ) -> Result<Arc<ParameterSnapshot>, ValidationError> {
        let _guard = self.write.lock();
        let accepted = self.validate_changes(changes).inspect_err(|err| {
            tracing::debug!(%err, "parameter update rejected");
        })?;

        let changed = accepted.len();
        let next = Arc::new(self.current.load().with_changes(accepted));
        self.publish(Arc::clone(&next));
        tracing::trace!(changed, "parameters updated");
        Ok(next)
    }

    /// Validate `overrides` without publishing anything.
    pub fn check(&self, overrides: &ParameterSnapshot) -> Result<(), ValidationError> {
        self.validate_changes(overrides.iter().map(|(k, v)| (k, v.clone())))
            .map(|_| ())
    }

    /// Apply initial values from a chain configuration.
    pub fn apply_initial(
        &self,
        overrides: &ParameterSnapshot,
    ) -> Result<Arc<ParameterSnapshot>, ValidationError> {
        self.update(overrides.iter().map(|(k, v)| (k, v.clone())))
    }

    /// Return every parameter to its default.
    pub fn reset_to_defaults(&self) -> Arc<ParameterSnapshot> {
        let _guard = self.write.lock();
        let defaults = Arc::new(ParameterSnapshot::from_defaults(self.definitions.values()));
        self.publish(Arc::clone(&defaults));
        defaults
    }

    fn validate_changes<K: Into<String>>(
        &self,
        changes: impl IntoIterator<Item = (K, ParamValue)>,
    ) -> Result<Vec<(String, ParamValue)>, ValidationError> {
        let mut accepted = Vec::new();
        let mut errors = Vec::new();
        for (name, value) in changes {
            let name = name.into();
            match self.definitions.get(name.as_str()) {
                Some(def) => match def.validate(&value) {
                    Ok(canonical) => accepted.push((name, canonical)),
                    Err(err) => errors.push(err),
                },
                None => errors.push(ValidationError::UnknownParameter(name)),
            }
        }
        match ValidationError::from_list(errors) {
            Some(err) => Err(err),
            None => Ok(accepted),
        }
    }

    fn publish(&self, snapshot: Arc<ParameterSnapshot>) {
        self.current.store(Arc::clone(&snapshot));

        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(Arc::clone(&snapshot)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("parameter subscriber is lagging, notification dropped");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

impl std::fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStore")
            .field("definitions", &self.definitions.keys().collect::<Vec<_>>())
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}

//! The authoritative table of tracked async resources.
//!
//! The registry owns every [`AsyncResource`], allocates ids, and applies the
//! lifecycle state machine. It is mutated only through
//! [`AsyncTracker`](crate::AsyncTracker), which keeps it consistent with the
//! trigger graph and the execution stack.

use hashbrown::{HashMap, HashSet};
use lineage_core::error::TrackerError;
use lineage_core::id::{AsyncId, Stamp};
use lineage_core::resource::{AsyncResource, DestroyOutcome, LifecycleEvent, ResourceType};

use crate::config::DEFAULT_PROMISE_TYPE;

/// Table of all tracked resources, in creation order.
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    resources: HashMap<AsyncId, AsyncResource>,
    /// Ids in creation order.
    order: Vec<AsyncId>,
    next_id: AsyncId,
    promise_types: HashSet<ResourceType>,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::with_promise_types([DEFAULT_PROMISE_TYPE])
    }
}

impl ResourceRegistry {
    /// Creates an empty registry with the default promise-like type.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry treating `kinds` as promise-like.
    #[must_use]
    pub fn with_promise_types<I, T>(kinds: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ResourceType>,
    {
        Self {
            resources: HashMap::new(),
            order: Vec::new(),
            next_id: AsyncId::FIRST,
            promise_types: kinds.into_iter().map(Into::into).collect(),
        }
    }

    /// Registers a new resource in `Initialized` state and returns its id.
    ///
    /// `uid` lets an integration supply its own id; otherwise one is
    /// allocated. `trigger` must be [`AsyncId::ROOT`] or an already
    /// registered resource.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::ReservedId`] if `uid` is the root sentinel
    /// - [`TrackerError::DuplicateRegistration`] if `uid` is already tracked
    /// - [`TrackerError::UnknownResource`] if `trigger` was never registered
    /// - [`TrackerError::IdSpaceExhausted`] if no id could follow the new one
    pub fn register(
        &mut self,
        kind: impl Into<ResourceType>,
        uid: Option<AsyncId>,
        trigger: AsyncId,
        at: Stamp,
    ) -> Result<AsyncId, TrackerError> {
        if !trigger.is_root() && !self.resources.contains_key(&trigger) {
            return Err(TrackerError::UnknownResource { uid: trigger });
        }

        let uid = match uid {
            Some(uid) if uid.is_root() || uid < AsyncId::ROOT => {
                return Err(TrackerError::ReservedId { uid });
            }
            Some(uid) if self.resources.contains_key(&uid) => {
                return Err(TrackerError::DuplicateRegistration { uid });
            }
            Some(uid) => {
                // Keep allocation monotonic past caller-supplied ids.
                let after = uid
                    .checked_next()
                    .ok_or(TrackerError::IdSpaceExhausted { uid })?;
                if after > self.next_id {
                    self.next_id = after;
                }
                uid
            }
            None => {
                let uid = self.next_id;
                self.next_id = uid
                    .checked_next()
                    .ok_or(TrackerError::IdSpaceExhausted { uid })?;
                uid
            }
        };

        self.resources
            .insert(uid, AsyncResource::new(uid, kind, trigger, at));
        self.order.push(uid);
        Ok(uid)
    }

    /// Applies `before` to a resource.
    ///
    /// # Errors
    ///
    /// [`TrackerError::UnknownResource`] or [`TrackerError::InvalidTransition`]
    /// for a destroyed resource.
    pub fn mark_before(&mut self, uid: AsyncId) -> Result<(), TrackerError> {
        self.resource_mut(uid)?.begin_execution()
    }

    /// Checks that `after` would be accepted, without changing anything.
    ///
    /// # Errors
    ///
    /// [`TrackerError::UnknownResource`] or [`TrackerError::UnmatchedAfter`].
    pub fn ensure_open(&self, uid: AsyncId) -> Result<(), TrackerError> {
        if self.resource(uid)?.open_executions() == 0 {
            return Err(TrackerError::UnmatchedAfter { uid });
        }
        Ok(())
    }

    /// Applies `after` to a resource.
    ///
    /// # Errors
    ///
    /// [`TrackerError::UnknownResource`] or [`TrackerError::UnmatchedAfter`].
    pub fn mark_after(&mut self, uid: AsyncId) -> Result<(), TrackerError> {
        self.resource_mut(uid)?.end_execution()
    }

    /// Applies `destroy` to a resource. A repeated destroy is reported through
    /// [`DestroyOutcome::AlreadyDestroyed`], not as an error.
    ///
    /// # Errors
    ///
    /// [`TrackerError::UnknownResource`].
    pub fn mark_destroy(&mut self, uid: AsyncId, at: Stamp) -> Result<DestroyOutcome, TrackerError> {
        Ok(self.resource_mut(uid)?.destroy(at))
    }

    /// Applies `promiseResolve` to a promise-like resource.
    ///
    /// # Errors
    ///
    /// [`TrackerError::UnknownResource`] or [`TrackerError::InvalidEventForType`]
    /// when the resource's type is not promise-like.
    pub fn mark_promise_resolve(&mut self, uid: AsyncId) -> Result<(), TrackerError> {
        let resource = self
            .resources
            .get_mut(&uid)
            .ok_or(TrackerError::UnknownResource { uid })?;
        if !self.promise_types.contains(resource.kind().as_str()) {
            return Err(TrackerError::InvalidEventForType {
                uid,
                kind: resource.kind().clone(),
                event: LifecycleEvent::PromiseResolve,
            });
        }
        resource.resolve_promise();
        Ok(())
    }

    /// Returns the resource with id `uid`, if tracked.
    #[must_use]
    pub fn get(&self, uid: AsyncId) -> Option<&AsyncResource> {
        self.resources.get(&uid)
    }

    /// Returns the resource with id `uid`.
    ///
    /// # Errors
    ///
    /// [`TrackerError::UnknownResource`].
    pub fn resource(&self, uid: AsyncId) -> Result<&AsyncResource, TrackerError> {
        self.resources
            .get(&uid)
            .ok_or(TrackerError::UnknownResource { uid })
    }

    fn resource_mut(&mut self, uid: AsyncId) -> Result<&mut AsyncResource, TrackerError> {
        self.resources
            .get_mut(&uid)
            .ok_or(TrackerError::UnknownResource { uid })
    }

    /// Returns `true` if `uid` is tracked.
    #[must_use]
    pub fn contains(&self, uid: AsyncId) -> bool {
        self.resources.contains_key(&uid)
    }

    /// Returns `true` if `kind` accepts `promiseResolve`.
    #[must_use]
    pub fn is_promise_type(&self, kind: &str) -> bool {
        self.promise_types.contains(kind)
    }

    /// Snapshot of every resource of type `kind`, in creation order,
    /// regardless of state.
    #[must_use]
    pub fn activities_of_type(&self, kind: &str) -> Vec<AsyncResource> {
        self.activities_of_types(&[kind])
    }

    /// Snapshot of every resource whose type is one of `kinds`, in creation order.
    #[must_use]
    pub fn activities_of_types(&self, kinds: &[&str]) -> Vec<AsyncResource> {
        self.iter()
            .filter(|resource| kinds.contains(&resource.kind().as_str()))
            .cloned()
            .collect()
    }

    /// Iterates over all resources in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &AsyncResource> {
        self.order.iter().filter_map(|uid| self.resources.get(uid))
    }

    /// Returns the number of tracked resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

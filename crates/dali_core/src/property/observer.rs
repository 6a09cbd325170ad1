//! Lifecycle subscriptions between property owners and the animations and
//! constraints that read or write them.
//!
//! Animators and constraints never hold a reference to their target. They
//! subscribe here by owner id, and the update manager publishes
//! `Connected`, `Disconnected` and `Destroyed` events at the moment the
//! owner changes state. Subscribers receive the events in the order they
//! subscribed.

use std::collections::HashMap;

use crate::common::{AnimationId, ConstraintId, PropertyOwnerId};

/// Something that depends on a property owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Observer {
    /// An animation with at least one animator targeting the owner
    Animation(AnimationId),
    /// A constraint whose target or a source is the owner
    Constraint(ConstraintId),
}

/// Owner lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerEvent {
    /// The owner joined the scene graph
    Connected,
    /// The owner left the scene graph but still exists
    Disconnected,
    /// The owner is gone; subscriptions to it are dropped
    Destroyed,
}

/// Publish/subscribe registry keyed by owner id
#[derive(Debug, Default)]
pub struct ObserverRegistry {
    subscriptions: HashMap<PropertyOwnerId, Vec<Observer>>,
}

impl ObserverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `observer` to `owner`; repeated subscriptions are ignored
    pub fn subscribe(&mut self, owner: PropertyOwnerId, observer: Observer) {
        let list = self.subscriptions.entry(owner).or_default();
        if !list.contains(&observer) {
            list.push(observer);
        }
    }

    /// Remove one subscription
    pub fn unsubscribe(&mut self, owner: PropertyOwnerId, observer: Observer) {
        if let Some(list) = self.subscriptions.get_mut(&owner) {
            list.retain(|o| *o != observer);
            if list.is_empty() {
                self.subscriptions.remove(&owner);
            }
        }
    }

    /// Remove every subscription held by `observer`
    pub fn unsubscribe_all(&mut self, observer: Observer) {
        self.subscriptions.retain(|_, list| {
            list.retain(|o| *o != observer);
            !list.is_empty()
        });
    }

    /// Observers of `owner`, in subscription order
    pub fn observers(&self, owner: PropertyOwnerId) -> &[Observer] {
        self.subscriptions.get(&owner).map_or(&[], Vec::as_slice)
    }

    /// Publish `event` for `owner`, returning who must be told
    ///
    /// `Destroyed` also drops every subscription to `owner`.
    pub fn publish(&mut self, owner: PropertyOwnerId, event: OwnerEvent) -> Vec<Observer> {
        match event {
            OwnerEvent::Destroyed => self.subscriptions.remove(&owner).unwrap_or_default(),
            OwnerEvent::Connected | OwnerEvent::Disconnected => self.observers(owner).to_vec(),
        }
    }

    /// Number of owners with at least one subscriber
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// True if nothing is subscribed
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{NodeId, ObjectId};

    #[test]
    fn test_destroyed_drops_subscriptions() {
        let mut registry = ObserverRegistry::new();
        let owner = PropertyOwnerId::Node(NodeId::from_raw(1));
        let a = Observer::Animation(AnimationId::from_raw(2));
        let c = Observer::Constraint(ConstraintId::from_raw(3));

        registry.subscribe(owner, a);
        registry.subscribe(owner, c);
        registry.subscribe(owner, a);

        assert_eq!(registry.publish(owner, OwnerEvent::Disconnected), vec![a, c]);
        assert_eq!(registry.publish(owner, OwnerEvent::Destroyed), vec![a, c]);
        assert!(registry.observers(owner).is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unsubscribe_all() {
        let mut registry = ObserverRegistry::new();
        let c = Observer::Constraint(ConstraintId::from_raw(9));
        let node = PropertyOwnerId::Node(NodeId::from_raw(1));
        let object = PropertyOwnerId::Object(ObjectId::from_raw(2));

        registry.subscribe(node, c);
        registry.subscribe(object, c);
        assert_eq!(registry.len(), 2);

        registry.unsubscribe_all(c);
        assert!(registry.is_empty());
    }
}

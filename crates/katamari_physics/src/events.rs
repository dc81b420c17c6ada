//! Contact events gathered during a step

use crate::collider::ColliderHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionEventType {
    Started,
    Stopped,
}

/// Two colliders began or stopped touching.
///
/// User data is copied from both colliders when the event is recorded, so it
/// stays readable after either collider is removed.
#[derive(Debug, Clone)]
pub struct CollisionEvent {
    pub collider1: ColliderHandle,
    pub collider2: ColliderHandle,
    pub event_type: CollisionEventType,
    /// Either side is a sensor
    pub is_sensor: bool,
    pub user_data1: u128,
    pub user_data2: u128,
}

impl CollisionEvent {
    pub fn is_started(&self) -> bool {
        self.event_type == CollisionEventType::Started
    }

    /// User data of the collider on the other side of `mine`, if `mine`
    /// takes part in this event
    pub fn other(&self, mine: u128) -> Option<u128> {
        if self.user_data1 == mine {
            Some(self.user_data2)
        } else if self.user_data2 == mine {
            Some(self.user_data1)
        } else {
            None
        }
    }
}

/// Events of the current `step` call, across all of its substeps
#[derive(Debug, Default)]
pub struct EventCollector {
    pub collision_events: Vec<CollisionEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.collision_events.clear();
    }

    pub fn started_collisions(&self) -> impl Iterator<Item = &CollisionEvent> {
        self.collision_events.iter().filter(|e| e.is_started())
    }
}

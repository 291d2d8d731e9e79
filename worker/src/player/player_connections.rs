use std::{collections::HashMap, time::Instant};

use meshwork_shared::EntityId;

use crate::receiver_config::HeartbeatConfig;

/// Heartbeat timers for the player entities this worker is responsible for.
/// Keyed by entity only; a removed entity simply stops being tracked.
pub struct PlayerConnections {
    config: HeartbeatConfig,
    last_heartbeats: HashMap<EntityId, Instant>,
}

impl PlayerConnections {
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            last_heartbeats: HashMap::new(),
        }
    }

    pub fn start_tracking(&mut self, entity_id: EntityId, now: &Instant) {
        self.last_heartbeats.insert(entity_id, *now);
    }

    pub fn stop_tracking(&mut self, entity_id: &EntityId) -> bool {
        self.last_heartbeats.remove(entity_id).is_some()
    }

    pub fn is_tracking(&self, entity_id: &EntityId) -> bool {
        self.last_heartbeats.contains_key(entity_id)
    }

    /// Returns false if the entity is not tracked
    pub fn on_heartbeat(&mut self, entity_id: &EntityId, now: &Instant) -> bool {
        let Some(last_heartbeat) = self.last_heartbeats.get_mut(entity_id) else {
            return false;
        };
        *last_heartbeat = *now;
        true
    }

    /// Stops tracking and returns every player whose heartbeat is overdue
    pub fn take_timed_out(&mut self, now: &Instant) -> Vec<EntityId> {
        let timeout = self.config.timeout;
        let mut timed_out: Vec<EntityId> = self
            .last_heartbeats
            .iter()
            .filter(|(_, last_heartbeat)| now.saturating_duration_since(**last_heartbeat) >= timeout)
            .map(|(entity_id, _)| *entity_id)
            .collect();
        timed_out.sort();
        for entity_id in &timed_out {
            self.last_heartbeats.remove(entity_id);
        }
        timed_out
    }

    pub fn len(&self) -> usize {
        self.last_heartbeats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_heartbeats.is_empty()
    }

    pub fn clear(&mut self) {
        self.last_heartbeats.clear();
    }
}

use std::{
    collections::HashMap,
    time::Instant,
};

use meshwork_shared::{ComponentId, EntityId, RequestId, RpcPayload};

/// An outgoing RPC sent as a command, so the runtime acknowledges it
#[derive(Clone, Debug, PartialEq)]
pub struct ReliableRpcForRetry {
    /// Entity of the local actor that sent the RPC. Only a worker
    /// authoritative over it may send.
    pub owner: EntityId,
    pub target_entity: EntityId,
    pub component_id: ComponentId,
    pub payload: RpcPayload,
    pub attempts: u32,
}

impl ReliableRpcForRetry {
    pub fn new(
        owner: EntityId,
        target_entity: EntityId,
        component_id: ComponentId,
        payload: RpcPayload,
    ) -> Self {
        Self {
            owner,
            target_entity,
            component_id,
            payload,
            attempts: 0,
        }
    }
}

/// Tracks outgoing reliable RPCs through three stages: in flight awaiting a
/// command response, scheduled for a retry, or parked until the worker
/// regains authority over the sending actor.
pub struct ReliableRpcTracker {
    in_flight: HashMap<RequestId, ReliableRpcForRetry>,
    retry_queue: Vec<(Instant, ReliableRpcForRetry)>,
    parked: HashMap<EntityId, Vec<ReliableRpcForRetry>>,
}

impl ReliableRpcTracker {
    pub fn new() -> Self {
        Self {
            in_flight: HashMap::new(),
            retry_queue: Vec::new(),
            parked: HashMap::new(),
        }
    }

    pub fn add_in_flight(&mut self, request_id: RequestId, rpc: ReliableRpcForRetry) {
        self.in_flight.insert(request_id, rpc);
    }

    pub fn take_in_flight(&mut self, request_id: &RequestId) -> Option<ReliableRpcForRetry> {
        self.in_flight.remove(request_id)
    }

    pub fn schedule_retry(&mut self, rpc: ReliableRpcForRetry, retry_at: Instant) {
        self.retry_queue.push((retry_at, rpc));
    }

    pub fn park(&mut self, rpc: ReliableRpcForRetry) {
        self.parked.entry(rpc.owner).or_default().push(rpc);
    }

    /// The worker lost authority over the owner: hold its scheduled retries
    pub fn park_owner(&mut self, owner: &EntityId) {
        let mut index = 0;
        while index < self.retry_queue.len() {
            if self.retry_queue[index].1.owner == *owner {
                let (_, rpc) = self.retry_queue.remove(index);
                self.park(rpc);
            } else {
                index += 1;
            }
        }
    }

    /// The worker regained authority over the owner: its parked RPCs become
    /// due immediately, in the order they were parked
    pub fn unpark_owner(&mut self, owner: &EntityId, now: &Instant) -> usize {
        let Some(rpcs) = self.parked.remove(owner) else {
            return 0;
        };
        let count = rpcs.len();
        for rpc in rpcs {
            self.retry_queue.push((*now, rpc));
        }
        count
    }

    /// Removes and returns every retry that is due, in scheduling order
    pub fn take_due(&mut self, now: &Instant) -> Vec<ReliableRpcForRetry> {
        let mut due = Vec::new();
        let mut index = 0;
        while index < self.retry_queue.len() {
            if self.retry_queue[index].0 <= *now {
                let (_, rpc) = self.retry_queue.remove(index);
                due.push(rpc);
            } else {
                index += 1;
            }
        }
        due
    }

    /// Forgets everything the owner sent that has not been acknowledged yet.
    /// Returns how many RPCs were dropped.
    pub fn drop_owner(&mut self, owner: &EntityId) -> usize {
        let before = self.len();
        self.in_flight.retain(|_, rpc| rpc.owner != *owner);
        self.retry_queue.retain(|(_, rpc)| rpc.owner != *owner);
        self.parked.remove(owner);
        before - self.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn parked_count(&self) -> usize {
        self.parked.values().map(Vec::len).sum()
    }

    pub fn len(&self) -> usize {
        self.in_flight.len() + self.retry_queue.len() + self.parked_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.in_flight.clear();
        self.retry_queue.clear();
        self.parked.clear();
    }
}

impl Default for ReliableRpcTracker {
    fn default() -> Self {
        Self::new()
    }
}

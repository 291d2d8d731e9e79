use std::{
    collections::{HashMap, VecDeque},
    fmt,
    time::Instant,
};

use meshwork_shared::{EntityId, ObjectRef, RpcPayload};

use super::rpc_error::{RpcError, RpcErrorKind};
use crate::receiver_config::RpcConfig;

/// Identifies a queued RPC. Ids follow arrival order and are never reused
/// within one Receiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueuedRpcId(u64);

impl QueuedRpcId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for QueuedRpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rpc#{}", self.0)
    }
}

pub struct QueuedRpc {
    pub id: QueuedRpcId,
    pub target: ObjectRef,
    pub payload: RpcPayload,
    pub sender: String,
    pub enqueued_at: Instant,
}

impl QueuedRpc {
    pub fn to_error(&self, kind: RpcErrorKind) -> RpcError {
        RpcError {
            kind,
            target: self.target,
            rpc_index: self.payload.index,
            sender: self.sender.clone(),
        }
    }
}

/// Result of trying to apply one RPC
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RpcOutcome {
    Applied,
    /// Not yet applicable. Lists the references that must resolve first;
    /// an empty list means the RPC should simply be retried later.
    Pending(Vec<ObjectRef>),
    Dropped(RpcErrorKind),
}

/// What a pass over a target's queue did
#[derive(Default)]
pub struct ProcessReport {
    pub applied: Vec<QueuedRpcId>,
    pub dropped: Vec<(QueuedRpcId, RpcError)>,
    /// The RPC each still-blocked queue is waiting on, with its references
    pub blocked: Vec<(QueuedRpcId, ObjectRef, Vec<ObjectRef>)>,
}

impl ProcessReport {
    /// Every RPC that left the queue
    pub fn finished(&self) -> impl Iterator<Item = QueuedRpcId> + '_ {
        self.applied
            .iter()
            .copied()
            .chain(self.dropped.iter().map(|(id, _)| *id))
    }

    fn append(&mut self, other: ProcessReport) {
        self.applied.extend(other.applied);
        self.dropped.extend(other.dropped);
        self.blocked.extend(other.blocked);
    }
}

/// Per-target FIFO queues of RPCs that could not be applied on arrival.
///
/// RPCs to the same target are applied in arrival order: a pass over a
/// target's queue stops at the first RPC that is still pending, and a new
/// RPC for a target with a non-empty queue is always queued behind it.
pub struct RpcAdmissionQueue {
    config: RpcConfig,
    queues: HashMap<ObjectRef, VecDeque<QueuedRpc>>,
    rpc_targets: HashMap<QueuedRpcId, ObjectRef>,
    next_id: u64,
}

impl RpcAdmissionQueue {
    pub fn new(config: RpcConfig) -> Self {
        Self {
            config,
            queues: HashMap::new(),
            rpc_targets: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn enqueue(
        &mut self,
        target: ObjectRef,
        payload: RpcPayload,
        sender: &str,
        now: &Instant,
    ) -> QueuedRpcId {
        let id = QueuedRpcId(self.next_id);
        self.next_id += 1;

        self.rpc_targets.insert(id, target);
        self.queues.entry(target).or_default().push_back(QueuedRpc {
            id,
            target,
            payload,
            sender: sender.to_string(),
            enqueued_at: *now,
        });

        id
    }

    pub fn has_queued(&self, target: &ObjectRef) -> bool {
        self.queues
            .get(target)
            .map(|queue| !queue.is_empty())
            .unwrap_or(false)
    }

    pub fn target_of(&self, id: &QueuedRpcId) -> Option<ObjectRef> {
        self.rpc_targets.get(id).copied()
    }

    /// Queued targets on the entity, oldest queue first
    pub fn targets_for_entity(&self, entity_id: &EntityId) -> Vec<ObjectRef> {
        let mut targets: Vec<(QueuedRpcId, ObjectRef)> = self
            .queues
            .iter()
            .filter(|(target, _)| target.entity == *entity_id)
            .filter_map(|(target, queue)| queue.front().map(|rpc| (rpc.id, *target)))
            .collect();
        targets.sort();
        targets.into_iter().map(|(_, target)| target).collect()
    }

    /// Applies the target's queued RPCs in order until one is still pending
    pub fn process_target<F>(&mut self, target: &ObjectRef, mut apply: F) -> ProcessReport
    where
        F: FnMut(&QueuedRpc) -> RpcOutcome,
    {
        let mut report = ProcessReport::default();

        let Some(queue) = self.queues.get_mut(target) else {
            return report;
        };

        while let Some(rpc) = queue.front() {
            match apply(rpc) {
                RpcOutcome::Applied => {
                    report.applied.push(rpc.id);
                }
                RpcOutcome::Dropped(kind) => {
                    report.dropped.push((rpc.id, rpc.to_error(kind)));
                }
                RpcOutcome::Pending(refs) => {
                    report.blocked.push((rpc.id, rpc.target, refs));
                    break;
                }
            }
            if let Some(rpc) = queue.pop_front() {
                self.rpc_targets.remove(&rpc.id);
            }
        }

        if queue.is_empty() {
            self.queues.remove(target);
        }

        report
    }

    /// Processes every queue, oldest queue first
    pub fn process_all<F>(&mut self, mut apply: F) -> ProcessReport
    where
        F: FnMut(&QueuedRpc) -> RpcOutcome,
    {
        let mut targets: Vec<(QueuedRpcId, ObjectRef)> = self
            .queues
            .iter()
            .filter_map(|(target, queue)| queue.front().map(|rpc| (rpc.id, *target)))
            .collect();
        targets.sort();

        let mut report = ProcessReport::default();
        for (_, target) in targets {
            report.append(self.process_target(&target, &mut apply));
        }
        report
    }

    /// Evicts RPCs that have waited at least the configured retention
    pub fn sweep(&mut self, now: &Instant) -> Vec<(QueuedRpcId, RpcError)> {
        let retention = self.config.queued_rpc_retention;
        let mut evicted = Vec::new();

        self.queues.retain(|_, queue| {
            // arrival order within a queue is also enqueue-time order
            while let Some(rpc) = queue.front() {
                if now.saturating_duration_since(rpc.enqueued_at) < retention {
                    break;
                }
                if let Some(rpc) = queue.pop_front() {
                    evicted.push((rpc.id, rpc.to_error(RpcErrorKind::Evicted)));
                }
            }
            !queue.is_empty()
        });

        evicted.sort_by_key(|(id, _)| *id);
        for (id, _) in &evicted {
            self.rpc_targets.remove(id);
        }
        evicted
    }

    /// Drops every RPC addressed to the entity
    pub fn clear_entity(
        &mut self,
        entity_id: &EntityId,
        kind: RpcErrorKind,
    ) -> Vec<(QueuedRpcId, RpcError)> {
        let targets: Vec<ObjectRef> = self
            .queues
            .keys()
            .filter(|target| target.entity == *entity_id)
            .copied()
            .collect();
        self.drain_targets(targets, kind)
    }

    /// Drops every queued RPC without reporting them
    pub fn clear(&mut self) {
        self.queues.clear();
        self.rpc_targets.clear();
    }

    pub fn len(&self) -> usize {
        self.rpc_targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rpc_targets.is_empty()
    }

    pub fn queued_for(&self, target: &ObjectRef) -> usize {
        self.queues.get(target).map(VecDeque::len).unwrap_or(0)
    }

    fn drain_targets(
        &mut self,
        targets: Vec<ObjectRef>,
        kind: RpcErrorKind,
    ) -> Vec<(QueuedRpcId, RpcError)> {
        let mut dropped = Vec::new();
        for target in targets {
            let Some(queue) = self.queues.remove(&target) else {
                continue;
            };
            for rpc in queue {
                self.rpc_targets.remove(&rpc.id);
                dropped.push((rpc.id, rpc.to_error(kind.clone())));
            }
        }
        dropped.sort_by_key(|(id, _)| *id);
        dropped
    }
}

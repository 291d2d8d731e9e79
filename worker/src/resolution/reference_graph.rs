use std::{
    collections::{HashMap, HashSet, VecDeque},
    time::{Duration, Instant},
};

use log::debug;

use meshwork_shared::{ComponentId, EntityId, FieldId, KeyGenerator, ObjectRef};

use crate::rpc::rpc_queue::QueuedRpcId;

pub type DependentHandle = u32;

/// Something that cannot be delivered until every object reference it
/// carries points at a constructed entity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dependent {
    /// A single field of a replicated component
    Property {
        entity_id: EntityId,
        component_id: ComponentId,
        field_id: FieldId,
    },
    /// The RPC at the front of a target's admission queue
    Rpc(QueuedRpcId),
}

/// A dependent that was waiting on a just-resolved entity. `remaining` lists
/// the references it still waits on; when empty the dependent has been
/// dropped from the graph and is ready to deliver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub dependent: Dependent,
    pub remaining: Vec<ObjectRef>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.remaining.is_empty()
    }
}

struct DependentRecord {
    dependent: Dependent,
    owner: EntityId,
    waiting_refs: HashSet<ObjectRef>,
    sequence: u64,
}

impl DependentRecord {
    fn sorted_waiting_refs(&self) -> Vec<ObjectRef> {
        let mut refs: Vec<ObjectRef> = self.waiting_refs.iter().copied().collect();
        refs.sort();
        refs
    }
}

/// Bidirectional index between unresolved object references and the
/// dependents waiting on them.
///
/// Each dependent has an owner entity. Releasing an entity drops every
/// dependent it owns and forgets every wait on it; a dependent left waiting
/// on a released entity stays unresolved until it is superseded, cancelled
/// or swept.
pub struct ReferenceGraph {
    handle_store: KeyGenerator<DependentHandle>,
    records: HashMap<DependentHandle, DependentRecord>,
    dependent_to_handle: HashMap<Dependent, DependentHandle>,
    waiting_ref_to_handles: HashMap<ObjectRef, HashSet<DependentHandle>>,
    waiting_entity_to_refs: HashMap<EntityId, HashSet<ObjectRef>>,
    owner_to_handles: HashMap<EntityId, HashSet<DependentHandle>>,
    property_ttls: VecDeque<(Instant, DependentHandle)>,
    next_sequence: u64,
}

impl ReferenceGraph {
    pub fn new() -> Self {
        Self {
            handle_store: KeyGenerator::new(Duration::from_secs(60)),
            records: HashMap::new(),
            dependent_to_handle: HashMap::new(),
            waiting_ref_to_handles: HashMap::new(),
            waiting_entity_to_refs: HashMap::new(),
            owner_to_handles: HashMap::new(),
            property_ttls: VecDeque::new(),
            next_sequence: 0,
        }
    }

    /// Records that `dependent` waits on `refs`. Null references are
    /// ignored. An earlier record for the same dependent is replaced, so a
    /// newer value of a field supersedes the older one; with nothing left
    /// to wait on the earlier record is simply dropped.
    ///
    /// Returns the record's handle, or `None` if there was nothing to wait on.
    pub fn await_resolution(
        &mut self,
        refs: impl IntoIterator<Item = ObjectRef>,
        dependent: Dependent,
        owner: EntityId,
        now: &Instant,
    ) -> Option<DependentHandle> {
        self.cancel(&dependent, now);

        let waiting_refs: HashSet<ObjectRef> =
            refs.into_iter().filter(|object_ref| !object_ref.is_null()).collect();
        if waiting_refs.is_empty() {
            return None;
        }

        let handle = self.handle_store.generate(now);

        for object_ref in &waiting_refs {
            self.waiting_ref_to_handles
                .entry(*object_ref)
                .or_default()
                .insert(handle);
            self.waiting_entity_to_refs
                .entry(object_ref.entity)
                .or_default()
                .insert(*object_ref);
        }
        self.owner_to_handles.entry(owner).or_default().insert(handle);
        self.dependent_to_handle.insert(dependent, handle);
        if matches!(dependent, Dependent::Property { .. }) {
            self.property_ttls.push_back((*now, handle));
        }

        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.records.insert(
            handle,
            DependentRecord {
                dependent,
                owner,
                waiting_refs,
                sequence,
            },
        );

        Some(handle)
    }

    /// The entity's object now exists: every reference into it is resolved.
    /// Each dependent that was waiting on the entity is reported exactly
    /// once, in the order it started waiting.
    pub fn resolve(&mut self, entity_id: &EntityId, now: &Instant) -> Vec<Resolution> {
        let Some(refs) = self.waiting_entity_to_refs.remove(entity_id) else {
            return Vec::new();
        };

        let mut handles = HashSet::new();
        for object_ref in refs {
            if let Some(waiting_handles) = self.waiting_ref_to_handles.remove(&object_ref) {
                handles.extend(waiting_handles);
            }
        }

        let mut ordered: Vec<(u64, DependentHandle)> = handles
            .into_iter()
            .filter_map(|handle| {
                self.records
                    .get(&handle)
                    .map(|record| (record.sequence, handle))
            })
            .collect();
        ordered.sort();

        let mut output = Vec::new();
        for (_, handle) in ordered {
            let Some(record) = self.records.get_mut(&handle) else {
                continue;
            };
            record
                .waiting_refs
                .retain(|object_ref| object_ref.entity != *entity_id);

            if record.waiting_refs.is_empty() {
                if let Some(record) = self.remove_record(&handle, now) {
                    output.push(Resolution {
                        dependent: record.dependent,
                        remaining: Vec::new(),
                    });
                }
            } else {
                output.push(Resolution {
                    dependent: record.dependent,
                    remaining: record.sorted_waiting_refs(),
                });
            }
        }

        output
    }

    /// The entity was removed. Drops every dependent it owns, returning
    /// them, and forgets every wait on it.
    pub fn release(&mut self, entity_id: &EntityId, now: &Instant) -> Vec<Dependent> {
        if let Some(refs) = self.waiting_entity_to_refs.remove(entity_id) {
            for object_ref in refs {
                if let Some(handles) = self.waiting_ref_to_handles.remove(&object_ref) {
                    debug!(
                        "{} dependent(s) will never see {} resolve",
                        handles.len(),
                        object_ref
                    );
                }
            }
        }

        let Some(owned) = self.owner_to_handles.remove(entity_id) else {
            return Vec::new();
        };
        let mut owned: Vec<DependentHandle> = owned.into_iter().collect();
        owned.sort_by_key(|handle| self.records.get(handle).map(|record| record.sequence));

        owned
            .into_iter()
            .filter_map(|handle| self.remove_record(&handle, now))
            .map(|record| record.dependent)
            .collect()
    }

    pub fn cancel_property(
        &mut self,
        entity_id: EntityId,
        component_id: ComponentId,
        field_id: FieldId,
        now: &Instant,
    ) -> bool {
        self.cancel(
            &Dependent::Property {
                entity_id,
                component_id,
                field_id,
            },
            now,
        )
    }

    pub fn cancel_rpc(&mut self, id: QueuedRpcId, now: &Instant) -> bool {
        self.cancel(&Dependent::Rpc(id), now)
    }

    /// Returns whether the dependent was waiting
    pub fn cancel(&mut self, dependent: &Dependent, now: &Instant) -> bool {
        let Some(handle) = self.dependent_to_handle.get(dependent).copied() else {
            return false;
        };
        self.remove_record(&handle, now).is_some()
    }

    /// Drops every waiting field of one component, returning how many there
    /// were
    pub fn cancel_component(
        &mut self,
        entity_id: &EntityId,
        component_id: &ComponentId,
        now: &Instant,
    ) -> usize {
        let Some(owned) = self.owner_to_handles.get(entity_id) else {
            return 0;
        };
        let matching: Vec<DependentHandle> = owned
            .iter()
            .copied()
            .filter(|handle| {
                matches!(
                    self.records.get(handle).map(|record| record.dependent),
                    Some(Dependent::Property { component_id: waiting_component, .. })
                        if waiting_component == *component_id
                )
            })
            .collect();

        let count = matching.len();
        for handle in matching {
            self.remove_record(&handle, now);
        }
        count
    }

    /// Drops field dependents that have waited at least `ttl`, returning
    /// each with the references it was still waiting on. RPC dependents are
    /// left to the admission queue's own retention.
    pub fn sweep(&mut self, now: &Instant, ttl: Duration) -> Vec<(Dependent, Vec<ObjectRef>)> {
        let mut expired = Vec::new();
        loop {
            let Some((created_at, _)) = self.property_ttls.front() else {
                break;
            };
            if now.saturating_duration_since(*created_at) < ttl {
                break;
            }
            let Some((_, handle)) = self.property_ttls.pop_front() else {
                break;
            };
            if let Some(record) = self.remove_record(&handle, now) {
                let refs = record.sorted_waiting_refs();
                expired.push((record.dependent, refs));
            }
        }
        expired
    }

    pub fn is_waiting(&self, dependent: &Dependent) -> bool {
        self.dependent_to_handle.contains_key(dependent)
    }

    pub fn waiting_refs(&self, dependent: &Dependent) -> Option<Vec<ObjectRef>> {
        let handle = self.dependent_to_handle.get(dependent)?;
        self.records.get(handle).map(DependentRecord::sorted_waiting_refs)
    }

    /// Number of dependents still waiting on some reference into the entity
    pub fn dependents_waiting_on(&self, entity_id: &EntityId) -> usize {
        let Some(refs) = self.waiting_entity_to_refs.get(entity_id) else {
            return 0;
        };
        let mut handles = HashSet::new();
        for object_ref in refs {
            if let Some(waiting_handles) = self.waiting_ref_to_handles.get(object_ref) {
                handles.extend(waiting_handles.iter().copied());
            }
        }
        handles.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.handle_store.clear();
        self.records.clear();
        self.dependent_to_handle.clear();
        self.waiting_ref_to_handles.clear();
        self.waiting_entity_to_refs.clear();
        self.owner_to_handles.clear();
        self.property_ttls.clear();
    }

    fn remove_record(&mut self, handle: &DependentHandle, now: &Instant) -> Option<DependentRecord> {
        let record = self.records.remove(handle)?;

        self.dependent_to_handle.remove(&record.dependent);

        // forward index entries may already be gone if the entity resolved
        // or was released
        for object_ref in &record.waiting_refs {
            let mut ref_done = false;
            if let Some(handles) = self.waiting_ref_to_handles.get_mut(object_ref) {
                handles.remove(handle);
                ref_done = handles.is_empty();
            }
            if !ref_done {
                continue;
            }
            self.waiting_ref_to_handles.remove(object_ref);
            let mut entity_done = false;
            if let Some(refs) = self.waiting_entity_to_refs.get_mut(&object_ref.entity) {
                refs.remove(object_ref);
                entity_done = refs.is_empty();
            }
            if entity_done {
                self.waiting_entity_to_refs.remove(&object_ref.entity);
            }
        }

        let mut owner_done = false;
        if let Some(handles) = self.owner_to_handles.get_mut(&record.owner) {
            handles.remove(handle);
            owner_done = handles.is_empty();
        }
        if owner_done {
            self.owner_to_handles.remove(&record.owner);
        }

        if let Some(ttl_index) = self
            .property_ttls
            .iter()
            .position(|(_, ttl_handle)| ttl_handle == handle)
        {
            self.property_ttls.remove(ttl_index);
        }

        self.handle_store.recycle_key(handle, now);

        Some(record)
    }
}

impl Default for ReferenceGraph {
    fn default() -> Self {
        Self::new()
    }
}

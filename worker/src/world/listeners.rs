use meshwork_shared::EntityId;

pub type EntityListener = Box<dyn FnMut(EntityId)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerKey(u32);

/// Callbacks notified, in registration order, when an entity is announced
/// or withdrawn.
pub struct EntityListeners {
    listeners: Vec<(ListenerKey, EntityListener)>,
    next_key: u32,
}

impl EntityListeners {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_key: 0,
        }
    }

    pub fn add(&mut self, listener: EntityListener) -> ListenerKey {
        let key = ListenerKey(self.next_key);
        self.next_key = self.next_key.wrapping_add(1);
        self.listeners.push((key, listener));
        key
    }

    pub fn remove(&mut self, key: &ListenerKey) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_key, _)| listener_key != key);
        self.listeners.len() != before
    }

    pub fn broadcast(&mut self, entity_id: EntityId) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(entity_id);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl Default for EntityListeners {
    fn default() -> Self {
        Self::new()
    }
}

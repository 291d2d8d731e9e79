use std::{
    collections::VecDeque,
    marker::PhantomData,
    time::{Duration, Instant},
};

/// Store that manages a recycling pool of u32 keys.
///
/// A recycled key only becomes available again once `recycle_timeout` has
/// passed, so a late reference to a just-freed key cannot alias a new record.
pub struct KeyGenerator<K: From<u32> + Into<u32> + Copy> {
    recycled_keys: VecDeque<(u32, Instant)>,
    recycle_timeout: Duration,
    next_new_key: u32,
    phantom: PhantomData<K>,
}

impl<K: From<u32> + Into<u32> + Copy> KeyGenerator<K> {
    pub fn new(recycle_timeout: Duration) -> Self {
        Self {
            recycled_keys: VecDeque::new(),
            recycle_timeout,
            next_new_key: 0,
            phantom: PhantomData,
        }
    }

    /// Get a new, unused key
    pub fn generate(&mut self, now: &Instant) -> K {
        if let Some((_, recycled_at)) = self.recycled_keys.front() {
            if now.saturating_duration_since(*recycled_at) >= self.recycle_timeout {
                if let Some((key, _)) = self.recycled_keys.pop_front() {
                    return K::from(key);
                }
            }
        }

        let output = self.next_new_key;
        self.next_new_key = self.next_new_key.wrapping_add(1);
        K::from(output)
    }

    /// Recycle a used key, freeing it up
    pub fn recycle_key(&mut self, key: &K, now: &Instant) {
        let raw: u32 = Into::<u32>::into(*key);
        self.recycled_keys.push_back((raw, *now));
    }

    pub fn clear(&mut self) {
        self.recycled_keys.clear();
        self.next_new_key = 0;
    }
}

use crate::error::BloomResult;
use crate::hash::BloomKey;

/// Membership operations shared by the fixed and the scalable filter.
pub trait MembershipFilter {
    /// Adds `key`. Returns `true` if the key was already (probably) present,
    /// in which case nothing changes.
    fn add<K: BloomKey + ?Sized>(&mut self, key: &K) -> BloomResult<bool>;

    /// `false` means definitely absent; `true` means probably present.
    fn contains<K: BloomKey + ?Sized>(&self, key: &K) -> bool;

    /// Adds every key, stopping at the first error. Returns how many keys
    /// were new.
    fn add_all<I>(&mut self, keys: I) -> BloomResult<usize>
    where
        I: IntoIterator,
        I::Item: BloomKey,
    {
        let mut added = 0;
        for key in keys {
            if !self.add(&key)? {
                added += 1;
            }
        }
        Ok(added)
    }

    fn contains_all<I>(&self, keys: I) -> Vec<bool>
    where
        I: IntoIterator,
        I::Item: BloomKey,
    {
        keys.into_iter().map(|key| self.contains(&key)).collect()
    }
}

pub trait FilterStats {
    /// Declared number of items before the error rate is exceeded.
    fn capacity(&self) -> usize;
    fn error_rate(&self) -> f64;
    /// Number of items added so far.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

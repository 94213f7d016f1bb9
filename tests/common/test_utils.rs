use rand::{Rng, distr::Alphanumeric};
use sliced_bloom_rs::StorageKind;

/// Every storage variant, so behavioural tests can run against each one.
#[allow(dead_code)]
pub const ALL_STORAGE_KINDS: [StorageKind; 2] =
    [StorageKind::BitArray, StorageKind::BoolVec];

/// Deterministic, distinct keys: `test_item_000000`, `test_item_000001`, ...
#[allow(dead_code)]
pub fn generate_test_items(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("test_item_{i:06}")).collect()
}

/// Random alphanumeric keys. Prefixed so they never collide with
/// [`generate_test_items`].
#[allow(dead_code)]
pub fn generate_random_keys(count: usize, len: usize) -> Vec<String> {
    let mut rng = rand::rng();
    (0..count)
        .map(|_| {
            let body: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(len)
                .map(char::from)
                .collect();
            format!("random_{body}")
        })
        .collect()
}

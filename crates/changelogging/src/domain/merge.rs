//! Insertion-ordered mapping merge.

/// Merge `overlay` on top of `base`, keyed by the first tuple element.
///
/// Keys keep the position of their first insertion; a later entry with the same key replaces the
/// value in place, and unseen keys are appended. Duplicate keys inside `base` collapse the same
/// way.
pub fn merge_ordered<K, V, B, O>(base: B, overlay: O) -> Vec<(K, V)>
where
    K: PartialEq,
    B: IntoIterator<Item = (K, V)>,
    O: IntoIterator<Item = (K, V)>,
{
    let mut merged: Vec<(K, V)> = Vec::new();
    for (key, value) in base.into_iter().chain(overlay) {
        match merged.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => merged.push((key, value)),
        }
    }
    merged
}

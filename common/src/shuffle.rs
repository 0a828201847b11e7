use crate::{Group, KeyValue};
use itertools::Itertools;

/// Collects every value emitted under the same key into one [`Group`].
///
/// Groups come back in ascending key order and each key appears exactly
/// once. The sort is stable, so values keep the order they were emitted in.
pub fn group_by_key<K, V>(mut intermediate: Vec<KeyValue<K, V>>) -> Vec<Group<K, V>>
where
    K: Ord + Clone,
{
    intermediate.sort_by(|a, b| a.key.cmp(&b.key));

    let grouped = intermediate.into_iter().group_by(|kv| kv.key.clone());
    let groups = grouped
        .into_iter()
        .map(|(key, kvs)| Group {
            key,
            values: kvs.map(|kv| kv.value).collect_vec(),
        })
        .collect_vec();
    groups
}

use std::collections::BTreeMap;

/// Merge maps in order; on a key collision the later map wins.
pub fn combine_maps<V: Clone>(maps: &[&BTreeMap<String, V>]) -> BTreeMap<String, V> {
    let mut result = BTreeMap::new();
    for map in maps {
        for (key, value) in map.iter() {
            result.insert(key.clone(), value.clone());
        }
    }
    result
}

/// Turn a phrase → literal-text table into typed-text actions.
pub fn text_map_to_action_map(
    text_map: &[(&str, &str)],
) -> BTreeMap<String, crate::action::Action> {
    text_map
        .iter()
        .map(|(phrase, text)| (phrase.to_string(), crate::action::Action::text(*text)))
        .collect()
}

use std::collections::HashMap;

use crate::models::Application;

/// Merge the in-session collection with a remotely stored one into a single
/// deduplicated collection.
///
/// Records are matched by their identity key, the (company, position,
/// appliedDate) triple, because the same application entered on two devices
/// carries two different ids. When both sides hold a record for one key, the
/// lexicographically greater id wins; ids are timestamp-derived, so the
/// greater one is the more recent edit. Equal ids keep the first occurrence,
/// and output order is the order keys were first seen (local first).
pub fn merge(local: &[Application], remote: &[Application]) -> Vec<Application> {
    let mut merged: Vec<Application> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for app in local.iter().chain(remote.iter()) {
        let key = app.identity_key();
        match index.get(&key) {
            Some(&slot) => {
                if app.id > merged[slot].id {
                    merged[slot] = app.clone();
                }
            }
            None => {
                index.insert(key, merged.len());
                merged.push(app.clone());
            }
        }
    }

    merged
}

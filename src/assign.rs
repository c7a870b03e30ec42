use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::types::{Device, ResolvedEntity, Snapshot};

/// Reduce a page path to its device code: keep the filename, drop the
/// extension, uppercase, and trim trailing digits (`TUV11.XML` and
/// `tuv1.xml` both become `TUV`).
pub fn normalize_page_code(page: &str) -> String {
    let name = page.rsplit('/').next().unwrap_or(page);
    let stem = name.split('.').next().unwrap_or(name);
    let upper = stem.to_uppercase();
    upper.trim_end_matches(|c: char| c.is_ascii_digit()).to_string()
}

/// Group entities into devices.
///
/// Each device, walked in priority order, claims the not-yet-claimed
/// entities whose source pages normalize to its code, so an entity
/// mentioned on several pages lands on exactly one device, the
/// highest-priority one. Entities without a descriptor, and entities
/// whose pages match no known code, fall to [`Device::Hidden`].
pub fn assign_devices(entities: Vec<ResolvedEntity>) -> Snapshot {
    let mut candidates: Vec<(BTreeSet<Device>, ResolvedEntity)> = entities
        .into_iter()
        .map(|entity| {
            let devices = if entity.has_descriptor() {
                entity
                    .source_pages
                    .iter()
                    .filter_map(|page| Device::from_code(&normalize_page_code(page)))
                    .collect()
            } else {
                BTreeSet::new()
            };
            (devices, entity)
        })
        .collect();

    let mut snapshot = Snapshot::default();
    let mut claimed: BTreeSet<String> = BTreeSet::new();

    for device in Device::PRIORITY {
        let mut owned = Vec::new();
        for (devices, entity) in &candidates {
            if claimed.contains(&entity.prop) {
                continue;
            }
            let matches = if device == Device::Hidden {
                // Catch-all: undescribed entities and unrecognized pages.
                devices.is_empty()
            } else {
                devices.contains(&device)
            };
            if matches {
                claimed.insert(entity.prop.clone());
                owned.push(entity.clone());
            }
        }
        if !owned.is_empty() {
            debug!(device = %device, count = owned.len(), "assigned entities");
            snapshot.devices.insert(device, owned);
        }
    }

    candidates.retain(|(_, e)| !claimed.contains(&e.prop));
    for (_, entity) in candidates {
        debug!(prop = %entity.prop, "entity left unassigned, placing under hidden");
        snapshot
            .devices
            .entry(Device::Hidden)
            .or_default()
            .push(entity);
    }

    snapshot
}

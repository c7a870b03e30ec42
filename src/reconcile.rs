use roxmltree::Document;
use tracing::{debug, warn};

use crate::descriptor::DescriptorSet;
use crate::types::{LiveSnapshot, LiveValue, ResolvedEntity};

/// Parse one live-value document into raw values, in document order.
///
/// Two wire shapes exist: `<INPUT P="NAME" VALUE="v"/>` rows, and elements
/// carrying a `prop` attribute with the value as text content. A document
/// with INPUT elements uses the first shape exclusively.
pub fn parse_live_document(xml: &str, page: &str) -> Vec<LiveValue> {
    let doc = match Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(page, error = %e, "unparsable live-value document");
            return Vec::new();
        }
    };

    let mut values = Vec::new();

    for node in doc.root_element().descendants().filter(|n| n.is_element()) {
        if node.tag_name().name() != "INPUT" {
            continue;
        }
        let (Some(prop), Some(value)) = (node.attribute("P"), node.attribute("VALUE")) else {
            continue;
        };
        if prop.is_empty() || value.is_empty() {
            continue;
        }
        values.push(LiveValue {
            prop: prop.to_string(),
            raw_value: value.to_string(),
            source_page: page.to_string(),
        });
    }

    if !values.is_empty() {
        debug!(page, count = values.len(), "parsed INPUT-style live document");
        return values;
    }

    for node in doc.root_element().descendants().filter(|n| n.is_element()) {
        let Some(prop) = node.attribute("prop") else {
            continue;
        };
        let value = node.text().map(str::trim).unwrap_or("");
        if value.is_empty() {
            continue;
        }
        values.push(LiveValue {
            prop: prop.to_string(),
            raw_value: value.to_string(),
            source_page: page.to_string(),
        });
    }

    debug!(page, count = values.len(), "parsed live document");
    values
}

/// Merge the cycle's live documents, in fetch-list order, into one
/// snapshot. The first occurrence of a prop wins; later pages echo the
/// same physical value and are only recorded as extra source pages.
pub fn merge_live_documents<I>(documents: I) -> LiveSnapshot
where
    I: IntoIterator<Item = Vec<LiveValue>>,
{
    let mut snapshot = LiveSnapshot::default();
    for document in documents {
        for value in document {
            snapshot.add(value);
        }
    }
    snapshot
}

/// Join descriptor specs with live values.
///
/// An entity is emitted when a value exists; if a spec also exists its
/// visibility predicate is checked against the full merged snapshot and a
/// hidden entity is skipped. Values with no spec anywhere are kept as
/// undescribed entities (assigned to the hidden device later). Specs with
/// no value are silently dropped.
pub fn resolve_entities(descriptors: &DescriptorSet, live: &LiveSnapshot) -> Vec<ResolvedEntity> {
    let mut entities = Vec::with_capacity(live.len());

    for value in live.iter() {
        let spec = descriptors.get(&value.prop);

        if let Some(spec) = spec
            && let Some(vis) = &spec.visibility
            && !vis.is_satisfied(live)
        {
            debug!(prop = %value.prop, "entity hidden by visibility predicate");
            continue;
        }

        let mut source_pages: Vec<String> = descriptors.pages_for(&value.prop).to_vec();
        for page in live.pages_for(&value.prop) {
            if !source_pages.contains(page) {
                source_pages.push(page.clone());
            }
        }

        entities.push(ResolvedEntity {
            prop: value.prop.clone(),
            spec: spec.cloned(),
            value: value.raw_value.clone(),
            source_pages,
        });
    }

    entities
}

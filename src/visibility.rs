use serde::Serialize;
use tracing::debug;

use crate::types::LiveSnapshot;

/// Conjunction of property-equals-value conditions from a `visData`
/// attribute: `"N;propA;valueA;propB;valueB;..."`.
///
/// A malformed string never yields a predicate (fail open) so a parse
/// error can never hide an entity that has a spec and a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibilityPredicate {
    pub conditions: Vec<(String, String)>,
}

impl VisibilityPredicate {
    /// Parse a `visData` attribute. Returns `None` for an empty string, a
    /// zero count, a non-numeric count, or a truncated pair list.
    pub fn parse(vis_data: &str) -> Option<Self> {
        if vis_data.is_empty() {
            return None;
        }

        let parts: Vec<&str> = vis_data.split(';').collect();
        let count: usize = match parts[0].trim().parse() {
            Ok(n) => n,
            Err(_) => {
                debug!(vis_data, "visData count is not numeric, treating as always visible");
                return None;
            }
        };
        if count == 0 {
            return None;
        }

        let mut conditions = Vec::with_capacity(count);
        for i in 0..count {
            let prop = parts.get(1 + i * 2);
            let expected = parts.get(2 + i * 2);
            match (prop, expected) {
                (Some(p), Some(v)) => conditions.push((p.to_string(), v.to_string())),
                _ => {
                    debug!(vis_data, "visData truncated, treating as always visible");
                    return None;
                }
            }
        }
        Some(Self { conditions })
    }

    /// Satisfied iff every condition matches the merged live snapshot by
    /// exact string equality. An absent prop never matches.
    pub fn is_satisfied(&self, snapshot: &LiveSnapshot) -> bool {
        self.conditions
            .iter()
            .all(|(prop, expected)| snapshot.get(prop) == Some(expected.as_str()))
    }
}

//! Merge declaration-level annotations into a member's annotations.

use crate::scan::AnnotationSet;
use crate::value::Value;

/// Names of the annotations that propagate from a declaration to its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidationRules {
    /// Route-style annotation: the declaration's `name` prefixes each member's `name`.
    pub route: String,
    /// Grouping annotation: the declaration's occurrence replaces the member's.
    pub sector: String,
}

impl Default for ConsolidationRules {
    fn default() -> Self {
        ConsolidationRules {
            route: "ApiRoute".to_string(),
            sector: "ApiSector".to_string(),
        }
    }
}

/// Field that route prefixing reads and writes.
const ROUTE_FIELD: &str = "name";

/// Combine a member's annotations with its declaration's.
///
/// A member without annotations inherits nothing. Only declaration names
/// with exactly one occurrence take part in the merge.
pub fn consolidate(
    member: AnnotationSet,
    declaration: &AnnotationSet,
    rules: &ConsolidationRules,
) -> AnnotationSet {
    let mut merged = member;
    if merged.is_empty() {
        return merged;
    }

    for (name, occurrences) in declaration {
        let [base] = occurrences.as_slice() else {
            continue;
        };

        if *name == rules.route {
            if let Some(routes) = merged.get_mut(name) {
                prefix_routes(routes, base);
            }
        }

        if *name == rules.sector {
            merged.insert(name.clone(), vec![base.clone()]);
        }
    }

    merged
}

fn prefix_routes(routes: &mut [Value], base: &Value) {
    let prefix = base.get(ROUTE_FIELD).map(Value::to_string).unwrap_or_default();
    for route in routes {
        let Some(fields) = route.as_map_mut() else {
            continue;
        };
        let path = fields
            .get(ROUTE_FIELD)
            .map(Value::to_string)
            .unwrap_or_default();
        fields.insert(ROUTE_FIELD.to_string(), Value::String(prefix.clone() + &path));
    }
}

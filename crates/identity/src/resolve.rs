use std::collections::BTreeMap;

use crate::graph::{build_graph, IdentityGraph};
use crate::model::{Cluster, IdentityMapping, MatchKey, UserId, UserRecord};
use crate::normalize::Normalizer;

/// Mapping plus the clusters it was derived from.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub mapping: IdentityMapping,
    /// Every component holding at least one user, ordered by canonical ID.
    pub clusters: Vec<Cluster>,
}

/// Reduce each component to its user IDs and pick the smallest as canonical.
///
/// Components made only of keys are skipped; they cannot arise from
/// [`IdentityGraph::add_record`].
pub fn resolve(graph: &IdentityGraph) -> Resolution {
    let mut canonical: BTreeMap<UserId, UserId> = BTreeMap::new();
    let mut clusters = Vec::new();

    for component in graph.components() {
        let mut members: Vec<UserId> =
            component.iter().filter_map(|n| n.as_user()).cloned().collect();
        if members.is_empty() {
            continue;
        }
        members.sort();
        let master = members[0].clone();
        for id in &members {
            canonical.insert(id.clone(), master.clone());
        }

        let mut keys: Vec<MatchKey> =
            component.iter().filter_map(|n| n.as_key()).cloned().collect();
        keys.sort();
        clusters.push(Cluster {
            canonical_id: master,
            members,
            keys,
        });
    }

    clusters.sort_by(|a, b| a.canonical_id.cmp(&b.canonical_id));

    Resolution {
        mapping: IdentityMapping::from_map(canonical),
        clusters,
    }
}

/// Map every user ID in the graph to its canonical ID.
pub fn resolve_components(graph: &IdentityGraph) -> IdentityMapping {
    resolve(graph).mapping
}

/// Build the graph for `records` and resolve it in one step.
pub fn resolve_user_identities(records: &[UserRecord], normalizer: &Normalizer) -> IdentityMapping {
    resolve_components(&build_graph(records, normalizer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MatchingConfig, MissingAttributePolicy};

    fn id(n: i64) -> UserId {
        UserId::from(n)
    }

    fn canon(mapping: &IdentityMapping, n: i64) -> UserId {
        mapping.canonical(&id(n)).cloned().unwrap()
    }

    #[test]
    fn shared_phone_merges_after_normalization() {
        let users = vec![
            UserRecord::new(1, Some("555-0100"), Some("a@x.com")),
            UserRecord::new(2, Some("5550100"), Some("b@x.com")),
            UserRecord::new(3, Some("999"), Some("c@x.com")),
        ];
        let mapping = resolve_user_identities(&users, &Normalizer::default());
        assert_eq!(mapping.len(), 3);
        assert_eq!(canon(&mapping, 1), id(1));
        assert_eq!(canon(&mapping, 2), id(1));
        assert_eq!(canon(&mapping, 3), id(3));
    }

    #[test]
    fn multi_hop_chain_resolves_to_lowest() {
        let users = vec![
            UserRecord::new(5, Some("777"), Some("shared@x.com")),
            UserRecord::new(2, Some("555"), Some("Shared@X.com ")),
            UserRecord::new(1, Some("(555)"), Some("one@x.com")),
        ];
        let mapping = resolve_user_identities(&users, &Normalizer::default());
        for n in [1, 2, 5] {
            assert_eq!(canon(&mapping, n), id(1));
        }
    }

    #[test]
    fn empty_input_gives_empty_mapping() {
        let mapping = resolve_user_identities(&[], &Normalizer::default());
        assert!(mapping.is_empty());
    }

    #[test]
    fn missing_attributes_collide_under_merge() {
        let users = vec![
            UserRecord::new(7, None, None),
            UserRecord::new(3, None, Some("c@x.com")),
            UserRecord::new(9, Some("123"), Some("z@x.com")),
        ];
        let mapping = resolve_user_identities(&users, &Normalizer::default());
        // 7 and 3 share the empty phone key.
        assert_eq!(canon(&mapping, 7), id(3));
        assert_eq!(canon(&mapping, 3), id(3));
        assert_eq!(canon(&mapping, 9), id(9));
    }

    #[test]
    fn missing_attributes_stay_apart_under_skip() {
        let normalizer = Normalizer::new(&MatchingConfig {
            missing_attributes: MissingAttributePolicy::Skip,
            ..MatchingConfig::default()
        });
        let users = vec![
            UserRecord::new(7, None, None),
            UserRecord::new(3, None, Some("c@x.com")),
            UserRecord::new(4, Some(""), Some("C@x.com")),
        ];
        let mapping = resolve_user_identities(&users, &normalizer);
        assert_eq!(canon(&mapping, 7), id(7));
        assert_eq!(canon(&mapping, 3), id(3));
        assert_eq!(canon(&mapping, 4), id(3));
    }

    #[test]
    fn lone_user_without_attributes_maps_to_itself() {
        let mapping =
            resolve_user_identities(&[UserRecord::new(42, None, None)], &Normalizer::default());
        assert_eq!(canon(&mapping, 42), id(42));
    }

    #[test]
    fn mixed_id_types_prefer_integers() {
        let users = vec![
            UserRecord::new("alpha", Some("1"), None),
            UserRecord::new(50, Some("1"), Some("q@x.com")),
            UserRecord::new("Zed", Some("1"), Some("r@x.com")),
        ];
        let mapping = resolve_user_identities(&users, &Normalizer::default());
        assert_eq!(mapping.canonical(&UserId::from("alpha")), Some(&id(50)));
        assert_eq!(mapping.canonical(&UserId::from("Zed")), Some(&id(50)));
    }

    #[test]
    fn string_ids_order_lexicographically() {
        let users = vec![
            UserRecord::new("u10", Some("1"), Some("a@x.com")),
            UserRecord::new("u9", Some("1"), Some("b@x.com")),
        ];
        let mapping = resolve_user_identities(&users, &Normalizer::default());
        assert_eq!(mapping.canonical(&UserId::from("u9")), Some(&UserId::from("u10")));
    }

    #[test]
    fn clusters_report_members_and_keys() {
        let users = vec![
            UserRecord::new(2, Some("555-0100"), Some("b@x.com")),
            UserRecord::new(1, Some("5550100"), Some("a@x.com")),
            UserRecord::new(3, Some("999"), Some("c@x.com")),
        ];
        let resolution = resolve(&build_graph(&users, &Normalizer::default()));
        assert_eq!(resolution.clusters.len(), 2);
        let first = &resolution.clusters[0];
        assert_eq!(first.canonical_id, id(1));
        assert_eq!(first.members, vec![id(1), id(2)]);
        let keys: Vec<String> = first.keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["PHONE_5550100", "EMAIL_a@x.com", "EMAIL_b@x.com"]);
        assert_eq!(resolution.clusters[1].members, vec![id(3)]);
    }
}

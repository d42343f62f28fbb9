//! Read-only membership index over a feature-graph snapshot.
//!
//! The graph is populated once through [`FeatureGraphBuilder`] and then
//! finalized into an immutable [`FeatureGraph`]: an arena of entities keyed
//! by ID plus reverse indexes answering "which relations contain this
//! entity" and "which ways pass through this node". Queries never mutate,
//! never block, and degrade to empty results for unknown IDs.

use crate::entity::{MemberKind, Relation, TagStore, Way};
use std::collections::HashMap;

/// Accumulates entities, then [`finalize`](Self::finalize)s into a
/// [`FeatureGraph`]. Insertion order of relations is preserved by the
/// reverse indexes, which keeps first-match operations deterministic.
#[derive(Default)]
pub struct FeatureGraphBuilder {
    relations: HashMap<i64, Relation>,
    relation_order: Vec<i64>,
    ways: HashMap<i64, Way>,
    way_order: Vec<i64>,
    node_tags: HashMap<i64, TagStore>,
}

impl FeatureGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a point feature's tags. Untagged nodes carry no signal for
    /// any query this graph answers and may be skipped by the caller.
    pub fn insert_node(&mut self, id: i64, tags: TagStore) {
        self.node_tags.insert(id, tags);
    }

    pub fn insert_way(&mut self, way: Way) {
        if !self.ways.contains_key(&way.id) {
            self.way_order.push(way.id);
        }
        self.ways.insert(way.id, way);
    }

    pub fn insert_relation(&mut self, relation: Relation) {
        if !self.relations.contains_key(&relation.id) {
            self.relation_order.push(relation.id);
        }
        self.relations.insert(relation.id, relation);
    }

    /// Build the reverse indexes and freeze the graph.
    pub fn finalize(self) -> FeatureGraph {
        let mut by_node_member: HashMap<i64, Vec<i64>> = HashMap::new();
        let mut by_way_member: HashMap<i64, Vec<i64>> = HashMap::new();
        let mut by_relation_member: HashMap<i64, Vec<i64>> = HashMap::new();

        for rel_id in &self.relation_order {
            let rel = &self.relations[rel_id];
            for member in &rel.node_members {
                by_node_member.entry(*member).or_default().push(rel.id);
            }
            for member in &rel.way_members {
                by_way_member.entry(*member).or_default().push(rel.id);
            }
            for member in &rel.relation_members {
                by_relation_member.entry(*member).or_default().push(rel.id);
            }
        }

        let mut ways_by_node: HashMap<i64, Vec<i64>> = HashMap::new();
        for way_id in &self.way_order {
            let way = &self.ways[way_id];
            for node in &way.node_refs {
                let entry = ways_by_node.entry(*node).or_default();
                // A closed way repeats its first node ref; index it once.
                if entry.last() != Some(&way.id) {
                    entry.push(way.id);
                }
            }
        }

        FeatureGraph {
            relations: self.relations,
            ways: self.ways,
            node_tags: self.node_tags,
            by_node_member,
            by_way_member,
            by_relation_member,
            ways_by_node,
        }
    }
}

/// Immutable snapshot of the feature graph plus its membership indexes.
pub struct FeatureGraph {
    relations: HashMap<i64, Relation>,
    ways: HashMap<i64, Way>,
    node_tags: HashMap<i64, TagStore>,
    by_node_member: HashMap<i64, Vec<i64>>,
    by_way_member: HashMap<i64, Vec<i64>>,
    by_relation_member: HashMap<i64, Vec<i64>>,
    ways_by_node: HashMap<i64, Vec<i64>>,
}

impl FeatureGraph {
    /// Relations listing `entity_id` in the given member partition.
    pub fn relations_containing(&self, entity_id: i64, kind: MemberKind) -> &[i64] {
        let index = match kind {
            MemberKind::Node => &self.by_node_member,
            MemberKind::Way => &self.by_way_member,
            MemberKind::Relation => &self.by_relation_member,
        };
        index.get(&entity_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Relations listing `entity_id` in any partition, deduplicated.
    ///
    /// Node, way, and relation IDs live in separate numbering spaces, so a
    /// hit here may be coincidental; seed discovery re-checks the partition
    /// matching the entity's actual kind before trusting it.
    pub fn relations_containing_any(&self, entity_id: i64) -> Vec<i64> {
        let mut out: Vec<i64> = Vec::new();
        for kind in [MemberKind::Node, MemberKind::Way, MemberKind::Relation] {
            for rel_id in self.relations_containing(entity_id, kind) {
                if !out.contains(rel_id) {
                    out.push(*rel_id);
                }
            }
        }
        out
    }

    /// Ordered member list of a relation's partition; empty for unknown IDs.
    pub fn members_of(&self, relation_id: i64, kind: MemberKind) -> &[i64] {
        self.relations
            .get(&relation_id)
            .map(|rel| rel.members(kind))
            .unwrap_or(&[])
    }

    pub fn relation(&self, id: i64) -> Option<&Relation> {
        self.relations.get(&id)
    }

    pub fn relation_tags(&self, id: i64) -> Option<&TagStore> {
        self.relations.get(&id).map(|rel| &rel.tags)
    }

    pub fn way(&self, id: i64) -> Option<&Way> {
        self.ways.get(&id)
    }

    pub fn node_tags(&self, id: i64) -> Option<&TagStore> {
        self.node_tags.get(&id)
    }

    /// Ways whose node list includes `node_id`.
    pub fn ways_through_node(&self, node_id: i64) -> &[i64] {
        self.ways_by_node
            .get(&node_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    pub fn node_count(&self) -> usize {
        self.node_tags.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::TagStore;

    fn tags(pairs: &[(&str, &str)]) -> TagStore {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn relation(id: i64, nodes: &[i64], ways: &[i64], relations: &[i64]) -> Relation {
        Relation {
            id,
            node_members: nodes.to_vec(),
            way_members: ways.to_vec(),
            relation_members: relations.to_vec(),
            tags: TagStore::new(),
        }
    }

    #[test]
    fn reverse_index_per_partition() {
        let mut builder = FeatureGraphBuilder::new();
        builder.insert_relation(relation(1, &[10], &[20], &[]));
        builder.insert_relation(relation(2, &[], &[20], &[1]));
        let graph = builder.finalize();

        assert_eq!(graph.relations_containing(10, MemberKind::Node), &[1]);
        assert_eq!(graph.relations_containing(20, MemberKind::Way), &[1, 2]);
        assert_eq!(graph.relations_containing(1, MemberKind::Relation), &[2]);
        assert!(graph.relations_containing(10, MemberKind::Way).is_empty());
    }

    #[test]
    fn any_partition_probe_deduplicates() {
        // Relation 1 lists the numeric ID 7 both as a node and as a way
        // member (distinct entities that happen to share a number).
        let mut builder = FeatureGraphBuilder::new();
        builder.insert_relation(relation(1, &[7], &[7], &[]));
        let graph = builder.finalize();

        assert_eq!(graph.relations_containing_any(7), vec![1]);
    }

    #[test]
    fn unknown_ids_yield_empty_results() {
        let graph = FeatureGraphBuilder::new().finalize();
        assert!(graph.relations_containing(99, MemberKind::Node).is_empty());
        assert!(graph.relations_containing_any(99).is_empty());
        assert!(graph.members_of(99, MemberKind::Way).is_empty());
        assert!(graph.relation(99).is_none());
        assert!(graph.way(99).is_none());
        assert!(graph.node_tags(99).is_none());
        assert!(graph.ways_through_node(99).is_empty());
    }

    #[test]
    fn members_of_preserves_order() {
        let mut builder = FeatureGraphBuilder::new();
        builder.insert_relation(relation(5, &[3, 1, 2], &[], &[]));
        let graph = builder.finalize();

        assert_eq!(graph.members_of(5, MemberKind::Node), &[3, 1, 2]);
    }

    #[test]
    fn ways_through_node_skips_closed_way_repeat() {
        let mut builder = FeatureGraphBuilder::new();
        builder.insert_way(Way::new(1, vec![10, 11, 12, 10], TagStore::new()));
        builder.insert_way(Way::new(2, vec![10, 13], tags(&[("railway", "rail")])));
        let graph = builder.finalize();

        assert_eq!(graph.ways_through_node(10), &[1, 2]);
        assert_eq!(graph.ways_through_node(13), &[2]);
    }

    #[test]
    fn reinserting_a_relation_replaces_it() {
        let mut builder = FeatureGraphBuilder::new();
        builder.insert_relation(relation(1, &[10], &[], &[]));
        builder.insert_relation(relation(1, &[11], &[], &[]));
        let graph = builder.finalize();

        assert_eq!(graph.members_of(1, MemberKind::Node), &[11]);
        assert!(graph.relations_containing(10, MemberKind::Node).is_empty());
        assert_eq!(graph.relations_containing(11, MemberKind::Node), &[1]);
        assert_eq!(graph.relation_count(), 1);
    }
}

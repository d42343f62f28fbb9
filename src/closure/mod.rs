//! Cycle-safe traversal over the relation-membership graph.
//!
//! Both directions share one frontier-by-frontier algorithm: walking up
//! ("which interesting relations list the current one as a member") or down
//! ("which interesting relations does the current one list as members").
//! Every in-flight path carries the relation IDs already walked, and a
//! relation is never re-entered along a path that already contains it, so
//! traversal terminates on cyclic data without any depth limit. A relation
//! reachable along several simple paths is expanded per path but appears in
//! the result set once, with the maximum level it was observed at.

use crate::entity::{MemberKind, TagStore};
use crate::graph::FeatureGraph;
use std::collections::{BTreeMap, BTreeSet};

/// Edge direction of the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow parent edges: relations containing the current relation.
    Up,
    /// Follow child edges: the current relation's relation-members.
    Down,
}

/// Result of an upward closure: the reached set and the root relation.
#[derive(Debug)]
pub struct UpwardClosure {
    /// Seeds plus every interesting relation reached above them.
    pub relations: BTreeSet<i64>,
    /// The relation observed at the highest traversal level, smallest ID
    /// winning a tie. `None` when the traversal never left the seed level.
    pub root: Option<i64>,
}

/// Walk parent edges from `seeds`, keeping relations accepted by
/// `interesting`, and derive the root relation from the level map.
pub fn upward_closure<F>(graph: &FeatureGraph, seeds: &BTreeSet<i64>, interesting: F) -> UpwardClosure
where
    F: Fn(&TagStore) -> bool,
{
    let levels = traverse(graph, seeds, Direction::Up, &interesting);
    let max_level = levels.values().copied().max().unwrap_or(0);
    let root = if max_level == 0 {
        None
    } else {
        levels
            .iter()
            .filter(|(_, level)| **level == max_level)
            .map(|(id, _)| *id)
            .min()
    };

    UpwardClosure {
        relations: levels.into_keys().collect(),
        root,
    }
}

/// Walk child edges from `seeds`, keeping relations accepted by
/// `interesting`. Flat deduplicated set, seeds included.
pub fn downward_closure<F>(
    graph: &FeatureGraph,
    seeds: &BTreeSet<i64>,
    interesting: F,
) -> BTreeSet<i64>
where
    F: Fn(&TagStore) -> bool,
{
    traverse(graph, seeds, Direction::Down, &interesting)
        .into_keys()
        .collect()
}

/// Shared frontier expansion. Returns the maximum level each relation was
/// observed at; seeds sit at level 0 and are always part of the result.
fn traverse<F>(
    graph: &FeatureGraph,
    seeds: &BTreeSet<i64>,
    direction: Direction,
    interesting: &F,
) -> BTreeMap<i64, u32>
where
    F: Fn(&TagStore) -> bool,
{
    let mut levels: BTreeMap<i64, u32> = seeds.iter().map(|id| (*id, 0)).collect();
    let mut frontier: Vec<(i64, Vec<i64>)> = seeds.iter().map(|id| (*id, vec![*id])).collect();
    let mut level = 0u32;

    while !frontier.is_empty() {
        level += 1;
        let mut next_frontier: Vec<(i64, Vec<i64>)> = Vec::new();

        for (rel_id, path) in &frontier {
            let mut neighbors: Vec<i64> = match direction {
                Direction::Up => graph
                    .relations_containing(*rel_id, MemberKind::Relation)
                    .to_vec(),
                Direction::Down => graph.members_of(*rel_id, MemberKind::Relation).to_vec(),
            };
            neighbors.sort_unstable();

            for neighbor in neighbors {
                if path.contains(&neighbor) {
                    // Cycle: silently truncated, never an error.
                    continue;
                }
                let Some(tags) = graph.relation_tags(neighbor) else {
                    continue;
                };
                if !interesting(tags) {
                    continue;
                }

                let recorded = levels.entry(neighbor).or_insert(level);
                if *recorded < level {
                    *recorded = level;
                }

                let mut next_path = path.clone();
                next_path.push(neighbor);
                next_frontier.push((neighbor, next_path));
            }
        }

        frontier = next_frontier;
    }

    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Relation, TagStore};
    use crate::graph::FeatureGraphBuilder;

    fn tags(pairs: &[(&str, &str)]) -> TagStore {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn grouping(id: i64, relation_members: &[i64]) -> Relation {
        Relation {
            id,
            relation_members: relation_members.to_vec(),
            tags: tags(&[("type", "site")]),
            ..Default::default()
        }
    }

    fn boring(id: i64, relation_members: &[i64]) -> Relation {
        Relation {
            id,
            relation_members: relation_members.to_vec(),
            tags: tags(&[("type", "multipolygon")]),
            ..Default::default()
        }
    }

    fn is_site(tags: &TagStore) -> bool {
        tags.get("type").is_some_and(|v| v == "site")
    }

    fn seeds(ids: &[i64]) -> BTreeSet<i64> {
        ids.iter().copied().collect()
    }

    #[test]
    fn results_are_supersets_of_the_seed_set() {
        // 3 contains 2 contains 1; no cycles.
        let mut builder = FeatureGraphBuilder::new();
        builder.insert_relation(grouping(1, &[]));
        builder.insert_relation(grouping(2, &[1]));
        builder.insert_relation(grouping(3, &[2]));
        let graph = builder.finalize();

        let up = upward_closure(&graph, &seeds(&[1]), |_| true);
        assert!(up.relations.is_superset(&seeds(&[1])));
        assert_eq!(up.relations, seeds(&[1, 2, 3]));

        let down = downward_closure(&graph, &seeds(&[3]), |_| true);
        assert!(down.is_superset(&seeds(&[3])));
        assert_eq!(down, seeds(&[1, 2, 3]));
    }

    #[test]
    fn root_is_the_highest_level_relation() {
        let mut builder = FeatureGraphBuilder::new();
        builder.insert_relation(grouping(1, &[]));
        builder.insert_relation(grouping(2, &[1]));
        builder.insert_relation(grouping(3, &[2]));
        let graph = builder.finalize();

        let up = upward_closure(&graph, &seeds(&[1]), is_site);
        assert_eq!(up.root, Some(3));
    }

    #[test]
    fn root_is_absent_when_nothing_lies_above_the_seeds() {
        let mut builder = FeatureGraphBuilder::new();
        builder.insert_relation(grouping(1, &[]));
        let graph = builder.finalize();

        let up = upward_closure(&graph, &seeds(&[1]), is_site);
        assert_eq!(up.root, None);
        assert_eq!(up.relations, seeds(&[1]));
    }

    #[test]
    fn root_tie_breaks_on_smallest_id() {
        // Two unrelated parents of the seed, both at level 1.
        let mut builder = FeatureGraphBuilder::new();
        builder.insert_relation(grouping(1, &[]));
        builder.insert_relation(grouping(9, &[1]));
        builder.insert_relation(grouping(4, &[1]));
        let graph = builder.finalize();

        let up = upward_closure(&graph, &seeds(&[1]), is_site);
        assert_eq!(up.root, Some(4));
    }

    #[test]
    fn cycles_terminate_and_appear_once() {
        // 1 -> 2 -> 3 -> 1 membership cycle.
        let mut builder = FeatureGraphBuilder::new();
        builder.insert_relation(grouping(1, &[3]));
        builder.insert_relation(grouping(2, &[1]));
        builder.insert_relation(grouping(3, &[2]));
        let graph = builder.finalize();

        let up = upward_closure(&graph, &seeds(&[1]), is_site);
        assert_eq!(up.relations, seeds(&[1, 2, 3]));

        let down = downward_closure(&graph, &seeds(&[1]), is_site);
        assert_eq!(down, seeds(&[1, 2, 3]));
    }

    #[test]
    fn self_membership_terminates() {
        let mut builder = FeatureGraphBuilder::new();
        builder.insert_relation(grouping(1, &[1]));
        let graph = builder.finalize();

        let down = downward_closure(&graph, &seeds(&[1]), is_site);
        assert_eq!(down, seeds(&[1]));
    }

    #[test]
    fn uninteresting_relations_block_the_walk() {
        // 1 is inside boring 2, which is inside interesting 3; the walk
        // must stop at 2 and never see 3.
        let mut builder = FeatureGraphBuilder::new();
        builder.insert_relation(grouping(1, &[]));
        builder.insert_relation(boring(2, &[1]));
        builder.insert_relation(grouping(3, &[2]));
        let graph = builder.finalize();

        let up = upward_closure(&graph, &seeds(&[1]), is_site);
        assert_eq!(up.relations, seeds(&[1]));
        assert_eq!(up.root, None);
    }

    #[test]
    fn relation_reached_by_two_paths_keeps_its_maximum_level() {
        // 4 is a direct parent of the seed (level 1) and also the parent
        // of 2 -> 3 (level 3). The longer path wins, making 4 the root
        // over the level-2 relation 3.
        let mut builder = FeatureGraphBuilder::new();
        builder.insert_relation(grouping(1, &[]));
        builder.insert_relation(grouping(2, &[1]));
        builder.insert_relation(grouping(3, &[2]));
        builder.insert_relation(grouping(4, &[1, 3]));
        let graph = builder.finalize();

        let up = upward_closure(&graph, &seeds(&[1]), is_site);
        assert_eq!(up.relations, seeds(&[1, 2, 3, 4]));
        assert_eq!(up.root, Some(4));
    }

    #[test]
    fn empty_seed_set_yields_empty_result() {
        let graph = FeatureGraphBuilder::new().finalize();
        let up = upward_closure(&graph, &BTreeSet::new(), |_| true);
        assert!(up.relations.is_empty());
        assert_eq!(up.root, None);
        assert!(downward_closure(&graph, &BTreeSet::new(), |_| true).is_empty());
    }
}

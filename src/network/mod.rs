//! Hierarchical network classification for hiking and cycling ways.
//!
//! Callers must only hand in ways already known to be path-like (trails,
//! footways, cycleways); behavior for any other input is unspecified. The
//! resolvers do not validate this.

use crate::entity::{MemberKind, TagStore};
use crate::graph::FeatureGraph;
use crate::utils::tag_in;
use serde::Serialize;
use std::collections::BTreeSet;

/// `route` values of ranked path route relations.
const PATH_ROUTES: [&str; 3] = ["hiking", "foot", "bicycle"];
/// The recognized walking and cycling network tiers.
const PATH_NETWORKS: [&str; 8] = ["iwn", "nwn", "rwn", "lwn", "icn", "ncn", "rcn", "lcn"];

/// A relation is a ranked path route when it is a hiking, foot, or bicycle
/// route carrying one of the recognized network tiers.
pub fn is_ranked_path_route(tags: &TagStore) -> bool {
    tags.get("type").is_some_and(|t| t == "route")
        && tag_in(tags, "route", &PATH_ROUTES)
        && tag_in(tags, "network", &PATH_NETWORKS)
}

/// Network tier of a way, international down to local. Serializes as the
/// lowercase OSM `network` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkTier {
    Iwn,
    Nwn,
    Rwn,
    Lwn,
    Icn,
    Ncn,
    Rcn,
    Lcn,
}

impl NetworkTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkTier::Iwn => "iwn",
            NetworkTier::Nwn => "nwn",
            NetworkTier::Rwn => "rwn",
            NetworkTier::Lwn => "lwn",
            NetworkTier::Icn => "icn",
            NetworkTier::Ncn => "ncn",
            NetworkTier::Rcn => "rcn",
            NetworkTier::Lcn => "lcn",
        }
    }
}

/// Distinct `network` values of ranked path routes containing the way.
fn relation_networks(graph: &FeatureGraph, way_id: i64) -> BTreeSet<String> {
    graph
        .relations_containing(way_id, MemberKind::Way)
        .iter()
        .filter_map(|rel_id| graph.relation_tags(*rel_id))
        .filter(|tags| is_ranked_path_route(tags))
        .filter_map(|tags| tags.get("network").cloned())
        .collect()
}

/// Hiking tier of a path-like way: the highest-priority `network` value
/// among its containing ranked hiking routes, `iwn` down to `lwn`.
pub fn hiking_network(graph: &FeatureGraph, way_id: i64) -> Option<NetworkTier> {
    let networks = relation_networks(graph, way_id);
    [
        NetworkTier::Iwn,
        NetworkTier::Nwn,
        NetworkTier::Rwn,
        NetworkTier::Lwn,
    ]
    .into_iter()
    .find(|tier| networks.contains(tier.as_str()))
}

/// Cycling tier of a path-like way.
///
/// An explicit international marker on the way itself (`icn=yes` or an
/// `icn_ref` tag) wins immediately, without consulting the graph. Below
/// that, relation-derived tiers rank above same-tier own-tag fallbacks
/// (`ncn=yes`/`ncn_ref`, then `rcn`, then `lcn`).
pub fn cycling_network(
    graph: &FeatureGraph,
    way_id: i64,
    way_tags: &TagStore,
) -> Option<NetworkTier> {
    let own_marker = |flag: &str, reference: &str| {
        way_tags.get(flag).is_some_and(|v| v == "yes") || way_tags.contains_key(reference)
    };

    if own_marker("icn", "icn_ref") {
        return Some(NetworkTier::Icn);
    }

    let networks = relation_networks(graph, way_id);
    if networks.contains("icn") {
        Some(NetworkTier::Icn)
    } else if networks.contains("ncn") || own_marker("ncn", "ncn_ref") {
        Some(NetworkTier::Ncn)
    } else if networks.contains("rcn") || own_marker("rcn", "rcn_ref") {
        Some(NetworkTier::Rcn)
    } else if networks.contains("lcn") || own_marker("lcn", "lcn_ref") {
        Some(NetworkTier::Lcn)
    } else {
        None
    }
}

/// Whether the way belongs to any bus or trolleybus route relation.
/// Tri-state by contract: `Some(true)` or `None`, never `Some(false)`.
pub fn is_bus_route_member(graph: &FeatureGraph, way_id: i64) -> Option<bool> {
    graph
        .relations_containing(way_id, MemberKind::Way)
        .iter()
        .filter_map(|rel_id| graph.relation_tags(*rel_id))
        .any(|tags| {
            tags.get("type").is_some_and(|t| t == "route")
                && tag_in(tags, "route", &["bus", "trolleybus"])
        })
        .then_some(true)
}

//! Transit-importance scoring for station features.
//!
//! Given a station mapped as a point, an area, or both, walk the relation
//! membership graph to find every associated public-transport route
//! relation, then fold the per-mode route names into a bounded score. All
//! queries are pure reads over a [`FeatureGraph`]; missing data shrinks the
//! result toward an empty, zero-score record rather than failing.

use crate::closure::{downward_closure, upward_closure};
use crate::entity::{EntityRef, MemberKind, TagStore};
use crate::graph::FeatureGraph;
use crate::utils::tag_in;
use std::collections::BTreeSet;

/// `public_transport` values marking a transit grouping relation.
const GROUPING_PT: [&str; 2] = ["stop_area", "stop_area_group"];
/// `type` values marking a transit grouping relation.
const GROUPING_TYPES: [&str; 3] = ["stop_area", "stop_area_group", "site"];
/// `railway` values marking a node as a station or stop.
const STOP_RAILWAY: [&str; 3] = ["station", "stop", "tram_stop"];
/// `public_transport` values marking a node as a station or stop.
const STOP_PT: [&str; 3] = ["stop", "stop_position", "tram_stop"];
/// `railway` values marking a way as a rail line.
const LINE_RAILWAY: [&str; 4] = ["subway", "light_rail", "tram", "rail"];

/// A relation is an interesting transit grouping when tagged as a stop
/// area, stop area group, or site.
pub fn is_transit_grouping(tags: &TagStore) -> bool {
    tag_in(tags, "public_transport", &GROUPING_PT) || tag_in(tags, "type", &GROUPING_TYPES)
}

/// A station feature handed to the scorer. At least one of the two slots
/// should be present; a feature mapped as both a node and an area carries
/// both. The area slot holds a way or the relation representing the area,
/// never a node.
#[derive(Debug, Clone, Copy, Default)]
pub struct StationRef {
    pub point: Option<i64>,
    pub area: Option<EntityRef>,
}

impl StationRef {
    pub fn point(id: i64) -> Self {
        StationRef {
            point: Some(id),
            area: None,
        }
    }

    pub fn area(area: EntityRef) -> Self {
        StationRef {
            point: None,
            area: Some(area),
        }
    }

    /// Build from the legacy signed form: `area_id < 0` denotes the
    /// relation with the negated ID, `area_id > 0` a way.
    pub fn from_signed(point_id: Option<i64>, area_id: Option<i64>) -> Self {
        StationRef {
            point: point_id,
            area: area_id.map(EntityRef::from_area_id),
        }
    }
}

/// Scoring result for one station: the root grouping relation (if the
/// upward walk found one), the bounded importance score, and the
/// deduplicated route names per mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitRoutes {
    pub root_relation: Option<i64>,
    /// In `[0, 999]`; hundreds = train, tens = subway + light rail,
    /// ones = tram + other railway, each digit capped independently.
    pub score: u16,
    pub trains: Vec<String>,
    pub subways: Vec<String>,
    pub light_rails: Vec<String>,
    pub trams: Vec<String>,
    pub railways: Vec<String>,
}

/// Score one station. Pure, read-only; safe to call concurrently for
/// different stations over the same graph.
pub fn score_station(graph: &FeatureGraph, station: &StationRef) -> TransitRoutes {
    let seeds = discover_seeds(graph, station);

    let upward = upward_closure(graph, &seeds, is_transit_grouping);
    let relations = downward_closure(graph, &upward.relations, is_transit_grouping);

    let stops = collect_stops(graph, &relations, station);
    let lines = collect_lines(graph, &stops, station);
    let routes = discover_routes(graph, &stops, &lines, &relations);

    let mut trains = BTreeSet::new();
    let mut subways = BTreeSet::new();
    let mut light_rails = BTreeSet::new();
    let mut trams = BTreeSet::new();
    let mut railways = BTreeSet::new();

    for rel_id in &routes {
        let Some(tags) = graph.relation_tags(*rel_id) else {
            continue;
        };
        let Some(mode) = tags.get("route") else {
            continue;
        };
        let Some(name) = route_display_name(tags) else {
            continue;
        };
        match mode.as_str() {
            "train" => trains.insert(name),
            "subway" => subways.insert(name),
            "light_rail" => light_rails.insert(name),
            "tram" => trams.insert(name),
            "railway" => railways.insert(name),
            _ => continue,
        };
    }

    let score = transit_score(
        trains.len(),
        subways.len() + light_rails.len(),
        trams.len() + railways.len(),
    );

    TransitRoutes {
        root_relation: upward.root,
        score,
        trains: trains.into_iter().collect(),
        subways: subways.into_iter().collect(),
        light_rails: light_rails.into_iter().collect(),
        trams: trams.into_iter().collect(),
        railways: railways.into_iter().collect(),
    }
}

/// Seed relations: transit groupings directly containing the station's
/// point (node partition) or area (way or relation partition). The legacy
/// store keeps one flat member array per relation, so direct containment is
/// probed against any partition first and then re-checked against the
/// partition matching the entity's kind; node, way, and relation numbering
/// spaces overlap and a union hit alone proves nothing.
fn discover_seeds(graph: &FeatureGraph, station: &StationRef) -> BTreeSet<i64> {
    let mut seeds = BTreeSet::new();

    let mut probe = |entity_id: i64, kind: MemberKind| {
        for rel_id in graph.relations_containing_any(entity_id) {
            if !graph.relations_containing(entity_id, kind).contains(&rel_id) {
                continue;
            }
            if graph
                .relation_tags(rel_id)
                .is_some_and(is_transit_grouping)
            {
                seeds.insert(rel_id);
            }
        }
    };

    if let Some(point_id) = station.point {
        probe(point_id, MemberKind::Node);
    }
    match station.area {
        Some(EntityRef::Way(way_id)) => probe(way_id, MemberKind::Way),
        Some(EntityRef::Relation(rel_id)) => {
            probe(rel_id, MemberKind::Relation);
            // The station's own grouping sweeps its members regardless of
            // how it is tagged.
            seeds.insert(rel_id);
        }
        Some(EntityRef::Node(_)) | None => {}
    }

    seeds
}

/// Station/stop nodes: node members of the relation set tagged as stations
/// or stops, plus the input point itself.
fn collect_stops(
    graph: &FeatureGraph,
    relations: &BTreeSet<i64>,
    station: &StationRef,
) -> BTreeSet<i64> {
    let mut stops = BTreeSet::new();

    for rel_id in relations {
        for node_id in graph.members_of(*rel_id, MemberKind::Node) {
            let Some(tags) = graph.node_tags(*node_id) else {
                continue;
            };
            if tag_in(tags, "railway", &STOP_RAILWAY) || tag_in(tags, "public_transport", &STOP_PT)
            {
                stops.insert(*node_id);
            }
        }
    }
    if let Some(point_id) = station.point {
        stops.insert(point_id);
    }

    stops
}

/// Rail lines: ways running through any stop node and tagged as rail,
/// plus the input way itself.
fn collect_lines(graph: &FeatureGraph, stops: &BTreeSet<i64>, station: &StationRef) -> BTreeSet<i64> {
    let mut lines = BTreeSet::new();

    for node_id in stops {
        for way_id in graph.ways_through_node(*node_id) {
            if let Some(way) = graph.way(*way_id)
                && tag_in(&way.tags, "railway", &LINE_RAILWAY)
            {
                lines.insert(*way_id);
            }
        }
    }
    if let Some(EntityRef::Way(way_id)) = station.area {
        lines.insert(way_id);
    }

    lines
}

/// Rail route relations associated with the station: those containing a
/// stop node, a line way, or a relation of the grouping set as members,
/// and those listed as relation-members of the grouping set itself (a
/// grouping sweeps the routes grouped under it).
fn discover_routes(
    graph: &FeatureGraph,
    stops: &BTreeSet<i64>,
    lines: &BTreeSet<i64>,
    relations: &BTreeSet<i64>,
) -> BTreeSet<i64> {
    let mut candidates = BTreeSet::new();

    for node_id in stops {
        candidates.extend(graph.relations_containing(*node_id, MemberKind::Node));
    }
    for way_id in lines {
        candidates.extend(graph.relations_containing(*way_id, MemberKind::Way));
    }
    for rel_id in relations {
        candidates.extend(graph.relations_containing(*rel_id, MemberKind::Relation));
        candidates.extend(graph.members_of(*rel_id, MemberKind::Relation));
    }

    candidates
        .into_iter()
        .filter(|rel_id| {
            graph
                .relation_tags(*rel_id)
                .is_some_and(|tags| {
                    tags.get("type").is_some_and(|t| t == "route")
                        && tag_in(
                            tags,
                            "route",
                            &["train", "subway", "light_rail", "tram", "railway"],
                        )
                })
        })
        .collect()
}

/// A route's display name: its `ref` tag when present, else its `name`
/// tag; the chosen value is split on commas and the first segment that is
/// non-empty after trimming represents the relation. A present-but-blank
/// `ref` yields no name at all.
fn route_display_name(tags: &TagStore) -> Option<String> {
    let raw = tags.get("ref").or_else(|| tags.get("name"))?;
    raw.split(',')
        .map(str::trim)
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Fold distinct-name counts into the three-digit score. Both rail digits
/// double when the station interchanges between heavy rail and
/// subway/light rail; each digit caps at 9 independently.
fn transit_score(trains: usize, subway_light: usize, tram_railway: usize) -> u16 {
    let bonus = if trains > 0 && subway_light > 0 { 2 } else { 1 };
    let hundreds = 9.min(bonus * trains);
    let tens = 9.min(bonus * subway_light);
    let ones = 9.min(tram_railway);
    (100 * hundreds + 10 * tens + ones) as u16
}

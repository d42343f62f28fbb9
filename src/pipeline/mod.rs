use anyhow::{Result, anyhow};
use crossbeam_channel::bounded;
use osmpbf::{BlobDecode, BlobReader, Element, PrimitiveBlock, RelMemberType};
use rayon::prelude::*;
use std::path::Path;

use crate::config::RuntimeConfig;
use crate::entity::{EntityRef, MemberKind, Relation, TagStore, Way};
use crate::graph::{FeatureGraph, FeatureGraphBuilder};
use crate::network::{cycling_network, hiking_network, is_bus_route_member};
use crate::output::{JsonlWriter, PathRow, ResultRow, StationRow};
use crate::transit::{StationRef, score_station};
use crate::utils::{ProgressCounter, build_tag_map};

/// A feature selected for scoring during the index pass.
#[derive(Debug, Clone)]
pub struct StationCandidate {
    pub entity: EntityRef,
    pub name: Option<String>,
}

/// The finalized graph plus the candidates found while building it.
pub struct IndexedExtract {
    pub graph: FeatureGraph,
    pub stations: Vec<StationCandidate>,
    pub paths: Vec<i64>,
}

#[derive(Default)]
struct IndexBatch {
    nodes: Vec<(i64, TagStore)>,
    ways: Vec<Way>,
    relations: Vec<Relation>,
    stations: Vec<StationCandidate>,
    paths: Vec<i64>,
}

impl IndexBatch {
    fn len(&self) -> u64 {
        (self.nodes.len() + self.ways.len() + self.relations.len()) as u64
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pass 1: decode the PBF in parallel, reduce each block to an
/// `IndexBatch`, and feed a single builder thread. Untagged nodes and
/// untagged ways carry no signal for any query and are skipped; relations
/// are always retained because the membership graph needs the full
/// relation topology.
pub fn index_extract(path: &Path, config: &RuntimeConfig) -> Result<IndexedExtract> {
    let reader = BlobReader::from_path(path)?;
    let (tx, rx) = bounded::<IndexBatch>(64);

    type BuilderOutput = (FeatureGraphBuilder, Vec<StationCandidate>, Vec<i64>);
    let builder_thread = std::thread::spawn(move || -> Result<BuilderOutput> {
        let mut builder = FeatureGraphBuilder::new();
        let mut stations = Vec::new();
        let mut paths = Vec::new();
        let progress = ProgressCounter::new("Pass 1/2: indexing elements", 100_000);

        for batch in rx {
            let batch_len = batch.len();
            for (id, tags) in batch.nodes {
                builder.insert_node(id, tags);
            }
            for way in batch.ways {
                builder.insert_way(way);
            }
            for relation in batch.relations {
                builder.insert_relation(relation);
            }
            stations.extend(batch.stations);
            paths.extend(batch.paths);
            if batch_len > 0 {
                progress.inc(batch_len);
            }
        }

        progress.finish();
        Ok((builder, stations, paths))
    });

    let decode_result = {
        let tx = tx.clone();
        reader
            .par_bridge()
            .try_for_each(move |blob_result| -> Result<()> {
                let blob = blob_result?;
                match blob.decode() {
                    Ok(BlobDecode::OsmHeader(_)) => Ok(()),
                    Ok(BlobDecode::OsmData(block)) => {
                        let batch = collect_batch(&block, config);
                        if !batch.is_empty() {
                            tx.send(batch).map_err(|err| {
                                anyhow!("Pipeline: Failed to send index batch: {}", err)
                            })?;
                        }
                        Ok(())
                    }
                    Ok(BlobDecode::Unknown(unknown)) => {
                        tracing::info!("Unknown blob: {}", unknown);
                        Ok(())
                    }
                    Err(error) => Err(error.into()),
                }
            })
    };

    drop(tx);

    // The builder thread holds the root cause when the channel
    // disconnected; check it before the decode result.
    let (builder, mut stations, mut paths) = match builder_thread.join() {
        Ok(Ok(output)) => output,
        Ok(Err(builder_err)) => {
            return if decode_result.is_err() {
                Err(builder_err.context("Pipeline: Builder thread failed (caused channel disconnect)"))
            } else {
                Err(builder_err)
            };
        }
        Err(panic_payload) => {
            let panic_msg = panic_payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic_payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            return Err(anyhow!("Pipeline: Builder thread panicked: {}", panic_msg));
        }
    };

    decode_result?;

    // Decode order is nondeterministic under par_bridge; fix the output
    // order here.
    stations.sort_by_key(|candidate| candidate_sort_key(&candidate.entity));
    paths.sort_unstable();

    let graph = builder.finalize();
    tracing::info!(
        "Indexed {} tagged nodes, {} ways, {} relations",
        graph.node_count(),
        graph.way_count(),
        graph.relation_count()
    );

    Ok(IndexedExtract {
        graph,
        stations,
        paths,
    })
}

fn candidate_sort_key(entity: &EntityRef) -> (u8, i64) {
    match entity {
        EntityRef::Node(id) => (0, *id),
        EntityRef::Way(id) => (1, *id),
        EntityRef::Relation(id) => (2, *id),
    }
}

fn collect_batch(block: &PrimitiveBlock, config: &RuntimeConfig) -> IndexBatch {
    let mut batch = IndexBatch::default();

    let mut push_node = |batch: &mut IndexBatch, id: i64, tags: TagStore| {
        if tags.is_empty() {
            return;
        }
        if config.stations.filter.matches(&tags) {
            batch.stations.push(StationCandidate {
                entity: EntityRef::Node(id),
                name: tags.get("name").cloned(),
            });
        }
        batch.nodes.push((id, tags));
    };

    for element in block.elements() {
        match element {
            Element::Node(node) => {
                push_node(&mut batch, node.id(), build_tag_map(node.tags()));
            }
            Element::DenseNode(node) => {
                push_node(&mut batch, node.id(), build_tag_map(node.tags()));
            }
            Element::Way(way) => {
                let tags = build_tag_map(way.tags());
                if tags.is_empty() {
                    continue;
                }
                if config.stations.filter.matches(&tags) {
                    batch.stations.push(StationCandidate {
                        entity: EntityRef::Way(way.id()),
                        name: tags.get("name").cloned(),
                    });
                }
                if config.paths.filter.matches(&tags) {
                    batch.paths.push(way.id());
                }
                batch.ways.push(Way::new(way.id(), way.refs().collect(), tags));
            }
            Element::Relation(rel) => {
                let mut relation = Relation::new(rel.id(), build_tag_map(rel.tags()));
                for member in rel.members() {
                    let kind = match member.member_type {
                        RelMemberType::Node => MemberKind::Node,
                        RelMemberType::Way => MemberKind::Way,
                        RelMemberType::Relation => MemberKind::Relation,
                    };
                    relation.push_member(kind, member.member_id);
                }
                if config.stations.filter.matches(&relation.tags) {
                    batch.stations.push(StationCandidate {
                        entity: EntityRef::Relation(rel.id()),
                        name: relation.tags.get("name").cloned(),
                    });
                }
                batch.relations.push(relation);
            }
        }
    }

    batch
}

/// Pass 2: score every candidate in parallel and stream rows to the sink.
/// Returns the number of rows written.
pub fn score_extract(
    extract: &IndexedExtract,
    classify_paths: bool,
    writer: JsonlWriter,
) -> Result<u64> {
    let (tx, rx) = bounded::<ResultRow>(256);
    let progress = ProgressCounter::new("Pass 2/2: scoring", 1_000);

    let writer_thread = std::thread::spawn(move || -> Result<u64> {
        let mut writer = writer;
        let mut count = 0u64;
        for row in rx {
            writer.write_row(&row)?;
            count += 1;
        }
        writer.finish()?;
        Ok(count)
    });

    let send_result = (|| -> Result<()> {
        extract
            .stations
            .par_iter()
            .try_for_each(|candidate| -> Result<()> {
                let row = station_row(&extract.graph, candidate);
                progress.inc(1);
                tx.send(ResultRow::Station(row))
                    .map_err(|err| anyhow!("Pipeline: Failed to send result row: {}", err))
            })?;

        if classify_paths {
            extract.paths.par_iter().try_for_each(|way_id| -> Result<()> {
                let row = path_row(&extract.graph, *way_id);
                progress.inc(1);
                tx.send(ResultRow::Path(row))
                    .map_err(|err| anyhow!("Pipeline: Failed to send result row: {}", err))
            })?;
        }

        Ok(())
    })();

    drop(tx);

    let count = match writer_thread.join() {
        Ok(Ok(count)) => count,
        Ok(Err(writer_err)) => {
            return if send_result.is_err() {
                Err(writer_err.context("Pipeline: Sink writer thread failed (caused channel disconnect)"))
            } else {
                Err(writer_err)
            };
        }
        Err(panic_payload) => {
            let panic_msg = panic_payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic_payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            return Err(anyhow!("Pipeline: Sink writer thread panicked: {}", panic_msg));
        }
    };

    send_result?;

    progress.finish();
    Ok(count)
}

pub fn station_row(graph: &FeatureGraph, candidate: &StationCandidate) -> StationRow {
    let station = match candidate.entity {
        EntityRef::Node(id) => StationRef::point(id),
        area => StationRef::area(area),
    };
    let routes = score_station(graph, &station);

    StationRow {
        element: candidate.entity.label(),
        id: candidate.entity.id(),
        name: candidate.name.clone(),
        root_relation: routes.root_relation,
        score: routes.score,
        trains: routes.trains,
        subways: routes.subways,
        light_rails: routes.light_rails,
        trams: routes.trams,
        railways: routes.railways,
    }
}

pub fn path_row(graph: &FeatureGraph, way_id: i64) -> PathRow {
    let empty = TagStore::new();
    let tags = graph.way(way_id).map(|way| &way.tags).unwrap_or(&empty);

    PathRow {
        element: "way",
        id: way_id,
        name: tags.get("name").cloned(),
        hiking: hiking_network(graph, way_id),
        cycling: cycling_network(graph, way_id, tags),
        bus_route: is_bus_route_member(graph, way_id),
    }
}

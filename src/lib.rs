//! Transit-importance scoring and path-network classification over an
//! OSM-style feature graph.
//!
//! The library core walks the relation membership graph around a station
//! feature to find its associated public-transport routes and fold them
//! into a bounded importance score, and ranks the hiking/cycling network
//! tier of path ways. All core queries are pure reads over an immutable
//! [`graph::FeatureGraph`] snapshot and can run concurrently. The `app`,
//! `pipeline`, and `output` modules wrap the core into a CLI that ingests
//! a PBF extract and streams JSONL results.

pub mod app;
pub mod closure;
pub mod config;
pub mod entity;
pub mod graph;
pub mod network;
pub mod output;
pub mod pipeline;
pub mod transit;
pub mod utils;

pub use closure::{Direction, UpwardClosure, downward_closure, upward_closure};
pub use entity::{EntityRef, MemberKind, Relation, TagStore, Way};
pub use graph::{FeatureGraph, FeatureGraphBuilder};
pub use network::{NetworkTier, cycling_network, hiking_network, is_bus_route_member};
pub use transit::{StationRef, TransitRoutes, score_station};

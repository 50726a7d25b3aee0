//! Bicycle routing core.
//!
//! A compact, read-only binary road graph (packed node/edge tables, shared
//! elevation-sample runs, a fixed spatial sector grid), a Dijkstra route
//! computer with a pluggable cost model, and route geometry / elevation
//! profile queries on top. Graphs are loaded once from a directory of table
//! files and shared freely across threads; all query state is per-call.

pub mod attributes;
pub mod builder;
pub mod cost;
pub mod error;
pub mod fixed;
pub mod formats;
pub mod geo;
pub mod graph;
pub mod profile;
pub mod route;
pub mod router;

pub use attributes::{Attribute, AttributeSet};
pub use cost::{CityBikeCost, CostFunction, UniformCost};
pub use error::LoadError;
pub use geo::{GeoPoint, Point, Projection};
pub use graph::Graph;
pub use profile::{elevation_profile, ElevationProfile};
pub use route::{MultiRoute, Route, RouteEdge, RoutePoint, SingleRoute};
pub use router::RouteComputer;

//! Path sources.
//!
//! Every source yields a complete replacement [`Path`](crate::geo::Path):
//! - [`ShapeGenerator`]: procedural loops, polygons, out-and-backs and random walks
//! - [`GpxLoader`]: the vertex sequence of an existing GPX file
//! - [`RoadSnapClient`]: a drawn path re-aligned to the road network by OSRM

mod gpx_files;
mod osrm;
mod shapes;

pub use gpx_files::{GpxError, GpxLoader};
pub use osrm::{DEFAULT_OSRM_ENDPOINT, RoadSnapClient, SnapError};
pub use shapes::{Shape, ShapeGenerator};

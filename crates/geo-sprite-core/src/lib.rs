//! Core library for building thumbnail sprite sheets from georeferenced map
//! collections.
//!
//! - `packer`: deterministic growing shelf packer (sizes in, sheet layout out)
//! - `remap`: ground-control-point and mask transformation into sheet space
//! - `pyramid`: IIIF Image API 3.0 static tile pyramid + descriptor
//! - `annotation`: Georeference Annotation parse/generate
//! - `fetcher` / `sprite`: cached retrieval and the per-variant pipeline
//!
//! Quick example:
//! ```ignore
//! use geo_sprite_core::prelude::*;
//! # fn main() -> geo_sprite_core::Result<()> {
//! let client = ReqwestClient::new()?;
//! let cfg = BuildConfig {
//!     widths: vec![128, 256],
//!     ..BuildConfig::new("https://example.org/annotation.json")
//! };
//! SpriteBuilder::new(&client, cfg).run(None)?;
//! # Ok(()) }
//! ```

pub mod annotation;
pub mod compositing;
pub mod error;
pub mod fetcher;
pub mod ids;
pub mod model;
pub mod output;
pub mod packer;
pub mod pyramid;
pub mod remap;
pub mod sprite;

pub use error::*;
pub use model::*;
pub use packer::*;
pub use sprite::*;

/// Convenience prelude for common types and functions.
/// Importing `geo_sprite_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::annotation::{generate_annotation, parse_annotation};
    pub use crate::error::{Result, SpriteError};
    pub use crate::fetcher::{HttpClient, ImageFetcher, ReqwestClient};
    pub use crate::ids::generate_id;
    pub use crate::model::{Gcp, GeoreferencedMap, Offset, Rect, Resource, SheetLayout};
    pub use crate::packer::GrowingPacker;
    pub use crate::pyramid::{ImageInfo, PyramidGenerator, TileLevel, levels, scale_factors};
    pub use crate::remap::{derive_map, remap_point};
    pub use crate::sprite::{BuildConfig, SpriteBuilder};
}

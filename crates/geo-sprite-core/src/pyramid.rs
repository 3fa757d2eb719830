use std::borrow::Cow;
use std::fs;
use std::path::Path;

use image::RgbImage;
use image::imageops::{self, FilterType};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

pub const DEFAULT_TILE_SIZE: u32 = 1024;

/// Tile pyramid descriptor, wire-compatible with a IIIF Image API 3.0
/// `info.json` for a level-0 (static tiles) service. Field order is fixed by
/// struct order so repeated runs serialize byte-identically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageInfo {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub protocol: String,
    pub profile: String,
    pub width: u32,
    pub height: u32,
    pub tiles: Vec<TileSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TileSpec {
    pub width: u32,
    #[serde(rename = "scaleFactors")]
    pub scale_factors: Vec<u32>,
}

impl ImageInfo {
    pub fn new(id: &str, width: u32, height: u32, tile_size: u32) -> Self {
        Self {
            context: "http://iiif.io/api/image/3/context.json".to_string(),
            id: id.to_string(),
            service_type: "ImageService3".to_string(),
            protocol: "http://iiif.io/api/image".to_string(),
            profile: "level0".to_string(),
            width,
            height,
            tiles: vec![TileSpec {
                width: tile_size,
                scale_factors: scale_factors(width, height, tile_size),
            }],
        }
    }
}

/// Power-of-two downsample factors: 1, 2, 4, … up to (and including) the
/// first factor at which the whole image fits inside a single tile.
pub fn scale_factors(width: u32, height: u32, tile_size: u32) -> Vec<u32> {
    let mut factors = vec![1u32];
    let mut sf = 1u32;
    while width.div_ceil(sf) > tile_size || height.div_ceil(sf) > tile_size {
        sf *= 2;
        factors.push(sf);
    }
    factors
}

/// One pyramid level: a downsample factor and the tile grid it induces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLevel {
    pub scale_factor: u32,
    pub level_width: u32,
    pub level_height: u32,
    /// Grid dimensions in tile units.
    pub cols: u32,
    pub rows: u32,
    pub tile_size: u32,
}

/// All levels for an image, base level first.
pub fn levels(width: u32, height: u32, tile_size: u32) -> Vec<TileLevel> {
    scale_factors(width, height, tile_size)
        .into_iter()
        .map(|sf| {
            let level_width = width.div_ceil(sf);
            let level_height = height.div_ceil(sf);
            TileLevel {
                scale_factor: sf,
                level_width,
                level_height,
                cols: level_width.div_ceil(tile_size),
                rows: level_height.div_ceil(tile_size),
                tile_size,
            }
        })
        .collect()
}

/// A single tile's addressing: the region it covers in full-resolution
/// coordinates and its output size in level pixels. Boundary tiles are
/// clipped, never padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRegion {
    pub col: u32,
    pub row: u32,
    /// Region in full-resolution (base) pixel coordinates.
    pub region_x: u32,
    pub region_y: u32,
    pub region_w: u32,
    pub region_h: u32,
    /// Output tile size in level pixels.
    pub out_w: u32,
    pub out_h: u32,
}

impl TileRegion {
    /// Canonical IIIF path for this tile: `{region}/{size}/0/default.jpg`.
    pub fn path(&self) -> String {
        format!(
            "{},{},{},{}/{},{}/0/default.jpg",
            self.region_x,
            self.region_y,
            self.region_w,
            self.region_h,
            self.out_w,
            self.out_h
        )
    }
}

impl TileLevel {
    /// Enumerates this level's tiles in row-major order. Their regions
    /// exactly cover the full image: no gaps, no overlap.
    pub fn tiles(&self, width: u32, height: u32) -> Vec<TileRegion> {
        let step = self.tile_size * self.scale_factor;
        let mut out = Vec::with_capacity((self.cols * self.rows) as usize);
        for row in 0..self.rows {
            for col in 0..self.cols {
                let region_x = col * step;
                let region_y = row * step;
                let region_w = step.min(width - region_x);
                let region_h = step.min(height - region_y);
                out.push(TileRegion {
                    col,
                    row,
                    region_x,
                    region_y,
                    region_w,
                    region_h,
                    out_w: self.tile_size.min(self.level_width - col * self.tile_size),
                    out_h: self.tile_size.min(self.level_height - row * self.tile_size),
                });
            }
        }
        out
    }
}

/// Slices a composite sheet into a multi-level tile pyramid on disk.
pub struct PyramidGenerator {
    tile_size: u32,
    jpeg_quality: u8,
}

impl PyramidGenerator {
    pub fn new(tile_size: u32, jpeg_quality: u8) -> Self {
        Self {
            tile_size,
            jpeg_quality,
        }
    }

    /// Writes tile files and `info.json` for `sheet` under `dir` and returns
    /// the descriptor. `id` becomes the descriptor's service id.
    pub fn generate(&self, sheet: &RgbImage, id: &str, dir: &Path) -> Result<ImageInfo> {
        let (width, height) = sheet.dimensions();
        fs::create_dir_all(dir)?;

        for level in levels(width, height, self.tile_size) {
            let level_img: Cow<'_, RgbImage> = if level.scale_factor == 1 {
                Cow::Borrowed(sheet)
            } else {
                Cow::Owned(imageops::resize(
                    sheet,
                    level.level_width,
                    level.level_height,
                    FilterType::Lanczos3,
                ))
            };
            debug!(
                scale_factor = level.scale_factor,
                cols = level.cols,
                rows = level.rows,
                "writing pyramid level"
            );
            level
                .tiles(width, height)
                .par_iter()
                .try_for_each(|tile| -> Result<()> {
                    let crop = imageops::crop_imm(
                        level_img.as_ref(),
                        tile.col * level.tile_size,
                        tile.row * level.tile_size,
                        tile.out_w,
                        tile.out_h,
                    )
                    .to_image();
                    let tile_path = dir.join(tile.path());
                    if let Some(parent) = tile_path.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    crate::output::save_jpeg(&crop, &tile_path, self.jpeg_quality)
                })?;
        }

        let info = ImageInfo::new(id, width, height, self.tile_size);
        let json = serde_json::to_string_pretty(&info)?;
        fs::write(dir.join("info.json"), json)?;
        Ok(info)
    }
}

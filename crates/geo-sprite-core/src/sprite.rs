//! Orchestrates one sprite build: annotation in, per-variant sheet + tile
//! pyramid + derived annotation out.

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use rayon::prelude::*;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::annotation;
use crate::compositing::blit_rgb;
use crate::error::{Result, SpriteError};
use crate::fetcher::{HttpClient, ImageFetcher};
use crate::ids;
use crate::model::GeoreferencedMap;
use crate::output::{save_jpeg, write_atomic};
use crate::packer::{DEFAULT_MAX_SIDE, GrowingPacker};
use crate::pyramid::{DEFAULT_TILE_SIZE, PyramidGenerator};
use crate::remap;

/// Progress callback, invoked once per retrieved-and-decoded raster.
pub type ProgressFn = dyn Fn() + Send + Sync;

pub struct BuildConfig {
    /// Source annotation document URL.
    pub annotation_url: String,
    /// Resolved resolution variants: one target sprite width per pass.
    pub widths: Vec<u32>,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// Public root the tile services will be served under.
    pub base_url: String,
    pub tile_size: u32,
    pub jpeg_quality: u8,
    /// Cap on concurrent image retrievals per variant.
    pub concurrency: usize,
    /// Packer growth ceiling (px per sheet side).
    pub max_side: u32,
}

impl BuildConfig {
    pub fn new(annotation_url: impl Into<String>) -> Self {
        Self {
            annotation_url: annotation_url.into(),
            widths: vec![128],
            output_dir: PathBuf::from("output"),
            cache_dir: PathBuf::from("cache"),
            base_url: "http://localhost:8000".to_string(),
            tile_size: DEFAULT_TILE_SIZE,
            jpeg_quality: 90,
            concurrency: 8,
            max_side: DEFAULT_MAX_SIDE,
        }
    }
}

pub struct SpriteBuilder<'a> {
    client: &'a dyn HttpClient,
    cfg: BuildConfig,
}

impl<'a> SpriteBuilder<'a> {
    pub fn new(client: &'a dyn HttpClient, cfg: BuildConfig) -> Self {
        Self { client, cfg }
    }

    /// Runs the full pipeline: load + parse the annotation, then one
    /// [`build_variant`](Self::build_variant) pass per configured width.
    pub fn run(&self, progress: Option<&ProgressFn>) -> Result<()> {
        let annotation_id = ids::generate_id(&self.cfg.annotation_url);
        let out_dir = self.cfg.output_dir.join(&annotation_id);
        fs::create_dir_all(&out_dir)?;

        let doc = self.load_annotation(&out_dir)?;
        let maps = annotation::parse_annotation(&doc)?;
        if maps.is_empty() {
            return Err(SpriteError::Empty);
        }
        info!(maps = maps.len(), %annotation_id, "parsed annotation");

        let meta = json!({ "sourceUrl": self.cfg.annotation_url });
        fs::write(out_dir.join("meta.json"), serde_json::to_string_pretty(&meta)?)?;

        for &width in &self.cfg.widths {
            self.build_variant(&maps, &annotation_id, width, &out_dir, progress)?;
        }
        Ok(())
    }

    /// The annotation document itself is cached beside the outputs; a warm
    /// copy short-circuits the network.
    fn load_annotation(&self, out_dir: &Path) -> Result<Value> {
        let path = out_dir.join("annotations.json");
        let bytes = if path.exists() {
            debug!("annotation cache hit");
            fs::read(&path)?
        } else {
            let bytes = self.client.get(&self.cfg.annotation_url)?;
            write_atomic(&path, &bytes)?;
            bytes
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// One full pass for a single resolution variant. Any retrieval, decode,
    /// packing, or write failure aborts the whole variant; partial output is
    /// not valid.
    pub fn build_variant(
        &self,
        maps: &[GeoreferencedMap],
        annotation_id: &str,
        width: u32,
        out_dir: &Path,
        progress: Option<&ProgressFn>,
    ) -> Result<()> {
        info!(width, "building sprite variant");
        let variant_dir = out_dir.join(width.to_string());
        fs::create_dir_all(&variant_dir)?;
        let cache_dir = self
            .cfg
            .cache_dir
            .join(annotation_id)
            .join(width.to_string());
        let fetcher = ImageFetcher::new(self.client, &cache_dir);

        // Retrieval fan-out on a bounded pool. Packing needs the complete,
        // order-stable size list, so every fetch joins here first.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.cfg.concurrency)
            .build()
            .map_err(|e| SpriteError::Pool(e.to_string()))?;
        let rasters: Vec<(RgbImage, f64)> = pool.install(|| {
            maps.par_iter()
                .map(|map| {
                    let bytes = fetcher.fetch_sprite(&map.resource.id, width)?;
                    let img = image::load_from_memory(&bytes)
                        .map_err(|e| {
                            SpriteError::Retrieval(format!(
                                "undecodable image {}: {e}",
                                map.resource.id
                            ))
                        })?
                        .to_rgb8();
                    let (w, h) = img.dimensions();
                    if w == 0 || h == 0 {
                        return Err(SpriteError::Sizing {
                            width: w,
                            height: h,
                            max_side: self.cfg.max_side,
                        });
                    }
                    let scale = w as f64 / map.resource.width as f64;
                    if let Some(f) = progress {
                        f();
                    }
                    Ok((img, scale))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let sizes: Vec<(u32, u32)> = rasters.iter().map(|(img, _)| img.dimensions()).collect();
        let layout = GrowingPacker::new(self.cfg.max_side).pack(&sizes)?;
        info!(
            sheet_width = layout.width,
            sheet_height = layout.height,
            "{}",
            layout.stats(&sizes).summary()
        );

        // Composite onto an opaque white canvas; unplaced pixels stay white.
        let mut sheet = RgbImage::from_pixel(layout.width, layout.height, Rgb([255, 255, 255]));
        for (i, (img, _)) in rasters.iter().enumerate() {
            let at = layout.placements[i];
            blit_rgb(img, &mut sheet, at.x, at.y);
        }
        let sheet_path = variant_dir.join("thumbnail-sprites.jpg");
        save_jpeg(&sheet, &sheet_path, self.cfg.jpeg_quality)?;
        info!(path = %sheet_path.display(), "wrote composite sheet");

        let service_id = format!("{}/{}/{}/iiif", self.cfg.base_url, annotation_id, width);
        let generator = PyramidGenerator::new(self.cfg.tile_size, self.cfg.jpeg_quality);
        let descriptor = generator.generate(&sheet, &service_id, &variant_dir.join("iiif"))?;
        info!(
            scale_factors = ?descriptor.tiles[0].scale_factors,
            "wrote tile pyramid"
        );

        let derived: Vec<GeoreferencedMap> = maps
            .iter()
            .enumerate()
            .map(|(i, map)| {
                remap::derive_map(
                    map,
                    layout.placements[i],
                    rasters[i].1,
                    &service_id,
                    layout.width,
                    layout.height,
                )
            })
            .collect();
        let derived_doc = annotation::generate_annotation(&derived);
        fs::write(
            variant_dir.join("thumbnail-sprites-annotation.json"),
            serde_json::to_string_pretty(&derived_doc)?,
        )?;
        info!("wrote derived annotation");
        Ok(())
    }
}

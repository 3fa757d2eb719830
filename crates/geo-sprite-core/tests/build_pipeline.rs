use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use geo_sprite_core::annotation::parse_annotation;
use geo_sprite_core::error::{Result, SpriteError};
use geo_sprite_core::fetcher::HttpClient;
use geo_sprite_core::ids::generate_id;
use geo_sprite_core::sprite::{BuildConfig, SpriteBuilder};
use image::{Rgb, RgbImage};
use serde_json::json;

const ANNOTATION_URL: &str = "https://annotations.example.org/collection.json";
const BASE_URL: &str = "https://pages.example.org/sprites";

struct MapClient {
    responses: HashMap<String, Vec<u8>>,
    calls: AtomicUsize,
}

impl HttpClient for MapClient {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| SpriteError::Retrieval(format!("HTTP 404 from {url}")))
    }
}

fn png_bytes(w: u32, h: u32, color: [u8; 3]) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(color)));
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn annotation_item(image_id: &str, width: u32, height: u32, gcp_resource: [f64; 2]) -> serde_json::Value {
    let w = width as f64;
    let h = height as f64;
    json!({
        "type": "Annotation",
        "motivation": "georeferencing",
        "id": format!("{image_id}#map"),
        "target": {
            "type": "SpecificResource",
            "source": { "id": image_id, "type": "ImageService3", "width": width, "height": height },
            "selector": {
                "type": "SvgSelector",
                "value": format!("<svg><polygon points=\"0,0 {w},0 {w},{h} 0,{h}\" /></svg>")
            }
        },
        "body": {
            "type": "FeatureCollection",
            "transformation": { "type": "polynomial", "options": { "order": 1 } },
            "features": [{
                "type": "Feature",
                "properties": { "resourceCoords": gcp_resource },
                "geometry": { "type": "Point", "coordinates": [4.9, 52.37] }
            }]
        }
    })
}

fn client() -> MapClient {
    let annotation = json!({
        "type": "AnnotationPage",
        "items": [
            annotation_item("https://images.example.org/iiif/a", 640, 480, [320.0, 240.0]),
            annotation_item("https://images.example.org/iiif/b", 320, 320, [160.0, 160.0]),
        ]
    });
    let mut responses = HashMap::new();
    responses.insert(
        ANNOTATION_URL.to_string(),
        serde_json::to_vec(&annotation).unwrap(),
    );
    // The mock serves fixed-size rasters at a tenth of the declared size.
    responses.insert(
        "https://images.example.org/iiif/a/full/64,/0/default.jpg".to_string(),
        png_bytes(64, 48, [200, 40, 40]),
    );
    responses.insert(
        "https://images.example.org/iiif/b/full/64,/0/default.jpg".to_string(),
        png_bytes(32, 32, [40, 200, 40]),
    );
    MapClient {
        responses,
        calls: AtomicUsize::new(0),
    }
}

fn config(out: &std::path::Path, cache: &std::path::Path) -> BuildConfig {
    BuildConfig {
        widths: vec![64],
        output_dir: out.to_path_buf(),
        cache_dir: cache.to_path_buf(),
        base_url: BASE_URL.to_string(),
        tile_size: 32,
        concurrency: 2,
        ..BuildConfig::new(ANNOTATION_URL)
    }
}

#[test]
fn full_variant_build_produces_all_artifacts() {
    let out = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let client = client();

    SpriteBuilder::new(&client, config(out.path(), cache.path()))
        .run(None)
        .unwrap();

    let annotation_id = generate_id(ANNOTATION_URL);
    let variant_dir = out.path().join(&annotation_id).join("64");
    assert!(out.path().join(&annotation_id).join("annotations.json").exists());
    assert!(out.path().join(&annotation_id).join("meta.json").exists());

    // Composite sheet: (64x48) seeds the canvas, (32x32) lands on a bottom
    // shelf, so the sheet is 64x80 with placements (0,0) and (0,48).
    let sheet = image::open(variant_dir.join("thumbnail-sprites.jpg")).unwrap();
    assert_eq!((sheet.width(), sheet.height()), (64, 80));

    let descriptor: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(variant_dir.join("iiif").join("info.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(descriptor["width"], 64);
    assert_eq!(descriptor["height"], 80);
    assert_eq!(descriptor["tiles"][0]["scaleFactors"], json!([1, 2, 4]));
    assert_eq!(
        descriptor["id"],
        format!("{BASE_URL}/{annotation_id}/64/iiif")
    );

    let derived_doc: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(variant_dir.join("thumbnail-sprites-annotation.json")).unwrap(),
    )
    .unwrap();
    let derived = parse_annotation(&derived_doc).unwrap();
    assert_eq!(derived.len(), 2);
    for map in &derived {
        assert_eq!(map.resource.id, format!("{BASE_URL}/{annotation_id}/64/iiif"));
        assert_eq!((map.resource.width, map.resource.height), (64, 80));
    }
    // scale 0.1, placements (0,0) and (0,48)
    assert_eq!(derived[0].gcps[0].resource, [32.0, 24.0]);
    assert_eq!(derived[0].gcps[0].geo, [4.9, 52.37]);
    assert_eq!(derived[1].gcps[0].resource, [16.0, 64.0]);
    assert_eq!(derived[0].resource_mask[2], [64.0, 48.0]);
    assert_eq!(derived[1].resource_mask[2], [32.0, 80.0]);
}

#[test]
fn warm_rerun_is_idempotent_and_offline() {
    let out = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let client = client();

    SpriteBuilder::new(&client, config(out.path(), cache.path()))
        .run(None)
        .unwrap();
    let calls_after_first = client.calls.load(Ordering::SeqCst);
    assert_eq!(calls_after_first, 3); // one annotation + two images

    let annotation_id = generate_id(ANNOTATION_URL);
    let variant_dir = out.path().join(&annotation_id).join("64");
    let sheet_first = std::fs::read(variant_dir.join("thumbnail-sprites.jpg")).unwrap();
    let derived_first =
        std::fs::read(variant_dir.join("thumbnail-sprites-annotation.json")).unwrap();

    SpriteBuilder::new(&client, config(out.path(), cache.path()))
        .run(None)
        .unwrap();
    assert_eq!(client.calls.load(Ordering::SeqCst), calls_after_first);

    let sheet_second = std::fs::read(variant_dir.join("thumbnail-sprites.jpg")).unwrap();
    let derived_second =
        std::fs::read(variant_dir.join("thumbnail-sprites-annotation.json")).unwrap();
    assert_eq!(sheet_first, sheet_second);
    assert_eq!(derived_first, derived_second);
}

#[test]
fn failed_image_retrieval_aborts_the_variant() {
    let out = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let mut client = client();
    client
        .responses
        .remove("https://images.example.org/iiif/b/full/64,/0/default.jpg");

    let err = SpriteBuilder::new(&client, config(out.path(), cache.path()))
        .run(None)
        .unwrap_err();
    assert!(matches!(err, SpriteError::Retrieval(_)));

    let annotation_id = generate_id(ANNOTATION_URL);
    let variant_dir = out.path().join(&annotation_id).join("64");
    assert!(!variant_dir.join("thumbnail-sprites.jpg").exists());
    assert!(!variant_dir.join("thumbnail-sprites-annotation.json").exists());
}

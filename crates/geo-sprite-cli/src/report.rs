//! Static HTML index over a sprite output tree.

use std::fs;
use std::path::Path;

use anyhow::Context;
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

#[derive(Serialize)]
struct Entry {
    annotation_id: String,
    width: u32,
    source_url: Option<String>,
    scale_factors: String,
    image_width: u64,
    image_height: u64,
    sprite_path: String,
    info_path: String,
    annotation_path: String,
}

/// Scans `out_dir` for completed variants (pyramid descriptor plus derived
/// annotation present) and writes `index.html` at its root.
pub fn run_index(out_dir: &Path) -> anyhow::Result<()> {
    let mut entries: Vec<Entry> = Vec::new();

    for dir_entry in
        fs::read_dir(out_dir).with_context(|| format!("read {}", out_dir.display()))?
    {
        let dir_entry = dir_entry?;
        if !dir_entry.file_type()?.is_dir() {
            continue;
        }
        let annotation_id = dir_entry.file_name().to_string_lossy().to_string();
        let ann_dir = dir_entry.path();
        if !ann_dir.join("annotations.json").exists() {
            continue;
        }
        let source_url = read_meta_source(&ann_dir);

        for sub in fs::read_dir(&ann_dir)? {
            let sub = sub?;
            if !sub.file_type()?.is_dir() {
                continue;
            }
            let Ok(width) = sub.file_name().to_string_lossy().parse::<u32>() else {
                continue;
            };
            let info_path = sub.path().join("iiif").join("info.json");
            let annotation_path = sub.path().join("thumbnail-sprites-annotation.json");
            if !info_path.exists() || !annotation_path.exists() {
                continue;
            }
            let descriptor: Value = serde_json::from_str(&fs::read_to_string(&info_path)?)
                .with_context(|| format!("parse {}", info_path.display()))?;
            let scale_factors = descriptor
                .pointer("/tiles/0/scaleFactors")
                .and_then(Value::as_array)
                .map(|a| {
                    a.iter()
                        .filter_map(Value::as_u64)
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            entries.push(Entry {
                annotation_id: annotation_id.clone(),
                width,
                source_url: source_url.clone(),
                scale_factors,
                image_width: descriptor.get("width").and_then(Value::as_u64).unwrap_or(0),
                image_height: descriptor
                    .get("height")
                    .and_then(Value::as_u64)
                    .unwrap_or(0),
                sprite_path: format!("./{annotation_id}/{width}/thumbnail-sprites.jpg"),
                info_path: format!("./{annotation_id}/{width}/iiif/info.json"),
                annotation_path: format!(
                    "./{annotation_id}/{width}/thumbnail-sprites-annotation.json"
                ),
            });
        }
    }

    entries.sort_by(|a, b| {
        a.annotation_id
            .cmp(&b.annotation_id)
            .then(a.width.cmp(&b.width))
    });

    let mut reg = Handlebars::new();
    reg.set_strict_mode(true);
    reg.register_template_string("index", include_str!("templates/index.hbs"))?;
    let html = reg.render("index", &serde_json::json!({ "entries": entries }))?;

    let index_path = out_dir.join("index.html");
    fs::write(&index_path, html).with_context(|| format!("write {}", index_path.display()))?;
    info!(?index_path, entries = entries.len(), "index written");
    Ok(())
}

fn read_meta_source(ann_dir: &Path) -> Option<String> {
    let meta: Value = serde_json::from_str(&fs::read_to_string(ann_dir.join("meta.json")).ok()?).ok()?;
    meta.get("sourceUrl")
        .and_then(Value::as_str)
        .map(String::from)
}

//! Georeference Annotation codec.
//!
//! Parses a W3C Web Annotation document carrying `georeferencing`
//! annotations into [`GeoreferencedMap`] records, and serializes records
//! back into an `AnnotationPage`. Only the fields this pipeline consumes are
//! interpreted; the geometric transformation descriptor rides along as raw
//! JSON.

use serde_json::{Map, Value, json};

use crate::error::{Result, SpriteError};
use crate::model::{Gcp, GeoreferencedMap, Resource};

fn malformed(msg: impl Into<String>) -> SpriteError {
    SpriteError::MalformedAnnotation(msg.into())
}

/// Parses an annotation document into map records, in document order.
/// Accepts an `AnnotationPage` or a single `Annotation`. Any missing
/// required field fails the whole document before any pipeline work starts.
pub fn parse_annotation(doc: &Value) -> Result<Vec<GeoreferencedMap>> {
    match doc.get("type").and_then(Value::as_str) {
        Some("AnnotationPage") => {
            let items = doc
                .get("items")
                .and_then(Value::as_array)
                .ok_or_else(|| malformed("AnnotationPage without items array"))?;
            items.iter().map(parse_item).collect()
        }
        Some("Annotation") => Ok(vec![parse_item(doc)?]),
        other => Err(malformed(format!(
            "expected AnnotationPage or Annotation, got {other:?}"
        ))),
    }
}

fn parse_item(item: &Value) -> Result<GeoreferencedMap> {
    if let Some(m) = item.get("motivation").and_then(Value::as_str) {
        if m != "georeferencing" {
            return Err(malformed(format!("unsupported motivation: {m}")));
        }
    }
    let target = item
        .get("target")
        .ok_or_else(|| malformed("annotation without target"))?;
    let source = target
        .get("source")
        .ok_or_else(|| malformed("target without source"))?;
    let resource = parse_resource(source)?;
    let resource_mask = parse_selector(target)?;
    let body = item
        .get("body")
        .ok_or_else(|| malformed("annotation without body"))?;
    let gcps = parse_gcps(body)?;
    let id = item
        .get("id")
        .or_else(|| item.get("@id"))
        .and_then(Value::as_str)
        .map(String::from);
    Ok(GeoreferencedMap {
        id,
        resource,
        gcps,
        resource_mask,
        transformation: body.get("transformation").cloned(),
    })
}

fn parse_resource(source: &Value) -> Result<Resource> {
    let id = source
        .get("id")
        .or_else(|| source.get("@id"))
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("resource without id"))?;
    Ok(Resource {
        id: id.to_string(),
        width: dimension(source, "width")?,
        height: dimension(source, "height")?,
    })
}

fn dimension(source: &Value, key: &str) -> Result<u32> {
    source
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .filter(|&v| v > 0)
        .ok_or_else(|| malformed(format!("resource without usable {key}")))
}

fn parse_selector(target: &Value) -> Result<Vec<[f64; 2]>> {
    let selector = target
        .get("selector")
        .ok_or_else(|| malformed("target without selector"))?;
    if selector.get("type").and_then(Value::as_str) != Some("SvgSelector") {
        return Err(malformed("selector is not an SvgSelector"));
    }
    let svg = selector
        .get("value")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("SvgSelector without value"))?;
    parse_svg_polygon(svg)
}

/// Extracts the vertex list from an SvgSelector value such as
/// `<svg><polygon points="0,0 100,0 100,50" /></svg>`.
pub fn parse_svg_polygon(svg: &str) -> Result<Vec<[f64; 2]>> {
    let attr = "points=\"";
    let start = svg
        .find(attr)
        .ok_or_else(|| malformed("selector svg without polygon points"))?
        + attr.len();
    let rest = &svg[start..];
    let end = rest
        .find('"')
        .ok_or_else(|| malformed("unterminated points attribute"))?;
    let mut vertices = Vec::new();
    for pair in rest[..end].split_whitespace() {
        let (x, y) = pair
            .split_once(',')
            .ok_or_else(|| malformed(format!("bad polygon vertex: {pair}")))?;
        vertices.push([parse_coord(x)?, parse_coord(y)?]);
    }
    if vertices.len() < 3 {
        return Err(malformed("resource mask needs at least three vertices"));
    }
    Ok(vertices)
}

fn parse_coord(s: &str) -> Result<f64> {
    s.trim()
        .parse()
        .map_err(|_| malformed(format!("bad coordinate: {s}")))
}

fn parse_gcps(body: &Value) -> Result<Vec<Gcp>> {
    let features = body
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("body without features"))?;
    features
        .iter()
        .map(|f| {
            Ok(Gcp {
                resource: coordinate_pair(
                    f.pointer("/properties/resourceCoords"),
                    "properties.resourceCoords",
                )?,
                geo: coordinate_pair(f.pointer("/geometry/coordinates"), "geometry.coordinates")?,
            })
        })
        .collect()
}

fn coordinate_pair(v: Option<&Value>, what: &str) -> Result<[f64; 2]> {
    let arr = v
        .and_then(Value::as_array)
        .ok_or_else(|| malformed(format!("GCP without {what}")))?;
    match arr.as_slice() {
        [a, b] => Ok([number(a, what)?, number(b, what)?]),
        _ => Err(malformed(format!("{what} is not a coordinate pair"))),
    }
}

fn number(v: &Value, what: &str) -> Result<f64> {
    v.as_f64()
        .ok_or_else(|| malformed(format!("{what} holds a non-numeric value")))
}

/// Serializes map records into an `AnnotationPage` document.
pub fn generate_annotation(maps: &[GeoreferencedMap]) -> Value {
    let items: Vec<Value> = maps.iter().map(generate_item).collect();
    json!({
        "@context": "http://www.w3.org/ns/anno.jsonld",
        "type": "AnnotationPage",
        "items": items,
    })
}

fn generate_item(map: &GeoreferencedMap) -> Value {
    let mut item = Map::new();
    item.insert(
        "@context".into(),
        json!([
            "http://iiif.io/api/extension/georef/1/context.json",
            "http://www.w3.org/ns/anno.jsonld"
        ]),
    );
    if let Some(id) = &map.id {
        item.insert("id".into(), json!(id));
    }
    item.insert("type".into(), json!("Annotation"));
    item.insert("motivation".into(), json!("georeferencing"));
    item.insert(
        "target".into(),
        json!({
            "type": "SpecificResource",
            "source": {
                "id": map.resource.id,
                "type": "ImageService3",
                "height": map.resource.height,
                "width": map.resource.width,
            },
            "selector": {
                "type": "SvgSelector",
                "value": svg_polygon(&map.resource_mask),
            }
        }),
    );
    let mut body = Map::new();
    body.insert("type".into(), json!("FeatureCollection"));
    if let Some(t) = &map.transformation {
        body.insert("transformation".into(), t.clone());
    }
    let features: Vec<Value> = map
        .gcps
        .iter()
        .map(|gcp| {
            json!({
                "type": "Feature",
                "properties": { "resourceCoords": gcp.resource },
                "geometry": { "type": "Point", "coordinates": gcp.geo }
            })
        })
        .collect();
    body.insert("features".into(), json!(features));
    item.insert("body".into(), Value::Object(body));
    Value::Object(item)
}

/// Renders a mask polygon as an SvgSelector value.
pub fn svg_polygon(mask: &[[f64; 2]]) -> String {
    let points = mask
        .iter()
        .map(|[x, y]| format!("{x},{y}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("<svg><polygon points=\"{points}\" /></svg>")
}

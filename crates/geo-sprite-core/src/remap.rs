use crate::model::{Gcp, GeoreferencedMap, Offset, Resource};

/// Maps a point from an image's original pixel space into sheet pixel space:
/// scale into retrieved-raster pixels, then translate by the placement
/// offset. Exact in f64, no clamping or rounding.
pub fn remap_point(p: [f64; 2], offset: Offset, scale: f64) -> [f64; 2] {
    [
        offset.x as f64 + p[0] * scale,
        offset.y as f64 + p[1] * scale,
    ]
}

/// Rewrites one map record into sheet space: every GCP resource coordinate
/// and every mask vertex goes through [`remap_point`] with this image's
/// placement and scale factor; geo coordinates and the transformation
/// descriptor are untouched. The resource is repointed at the sheet's tile
/// service with the sheet's dimensions.
pub fn derive_map(
    map: &GeoreferencedMap,
    offset: Offset,
    scale: f64,
    sheet_resource_id: &str,
    sheet_width: u32,
    sheet_height: u32,
) -> GeoreferencedMap {
    GeoreferencedMap {
        id: map.id.clone(),
        resource: Resource {
            id: sheet_resource_id.to_string(),
            width: sheet_width,
            height: sheet_height,
        },
        gcps: map
            .gcps
            .iter()
            .map(|gcp| Gcp {
                resource: remap_point(gcp.resource, offset, scale),
                geo: gcp.geo,
            })
            .collect(),
        resource_mask: map
            .resource_mask
            .iter()
            .map(|&v| remap_point(v, offset, scale))
            .collect(),
        transformation: map.transformation.clone(),
    }
}

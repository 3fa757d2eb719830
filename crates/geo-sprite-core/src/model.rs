use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    pub fn area(&self) -> u64 {
        (self.w as u64) * (self.h as u64)
    }
    /// Returns true if a `w`x`h` rectangle fits inside this one.
    pub fn fits(&self, w: u32, h: u32) -> bool {
        self.w >= w && self.h >= h
    }
}

/// Top-left offset assigned to one packed rectangle. Write-once: produced by
/// the packer, never mutated afterwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Offset {
    pub x: u32,
    pub y: u32,
}

/// Result of one packing run: the sheet bounding box and one offset per input
/// size, aligned by index with the size slice handed to the packer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetLayout {
    pub width: u32,
    pub height: u32,
    pub placements: Vec<Offset>,
}

/// Packing efficiency numbers for one sheet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LayoutStats {
    pub sheet_area: u64,
    pub used_area: u64,
    /// used_area / sheet_area (0.0 to 1.0). Higher is better.
    pub occupancy: f64,
}

impl SheetLayout {
    /// Computes occupancy statistics given the sizes this layout was packed
    /// from (same order as `placements`).
    pub fn stats(&self, sizes: &[(u32, u32)]) -> LayoutStats {
        let sheet_area = (self.width as u64) * (self.height as u64);
        let used_area = sizes
            .iter()
            .map(|&(w, h)| (w as u64) * (h as u64))
            .sum::<u64>();
        let occupancy = if sheet_area > 0 {
            used_area as f64 / sheet_area as f64
        } else {
            0.0
        };
        LayoutStats {
            sheet_area,
            used_area,
            occupancy,
        }
    }
}

impl LayoutStats {
    pub fn summary(&self) -> String {
        format!(
            "Sheet: {} px², Used: {} px², Occupancy: {:.2}%",
            self.sheet_area,
            self.used_area,
            self.occupancy * 100.0,
        )
    }
}

/// The image resource a georeferenced map points at: a IIIF image service
/// root plus its declared full-resolution pixel dimensions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub id: String,
    pub width: u32,
    pub height: u32,
}

/// Ground control point: a pixel coordinate in the resource paired with a
/// geographic coordinate. Only the resource side is ever transformed; the geo
/// side passes through every stage untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gcp {
    pub resource: [f64; 2],
    pub geo: [f64; 2],
}

/// One georeferenced map record: the parsed form of a single georeferencing
/// annotation, and also the derived form emitted after packing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeoreferencedMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub resource: Resource,
    pub gcps: Vec<Gcp>,
    /// Ordered closed polygon in resource pixel space marking the valid
    /// image region.
    pub resource_mask: Vec<[f64; 2]>,
    /// Geometric transformation descriptor. Opaque; carried through to the
    /// derived annotation unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation: Option<serde_json::Value>,
}

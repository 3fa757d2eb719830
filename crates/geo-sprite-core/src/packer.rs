use crate::error::{Result, SpriteError};
use crate::model::{Offset, Rect, SheetLayout};
use tracing::debug;

/// Default per-side growth ceiling. Matches the JPEG dimension limit, which
/// the composite sheet must stay under anyway.
pub const DEFAULT_MAX_SIDE: u32 = 65_535;

/// Growing shelf packer: places rectangles tallest-first into an expanding
/// canvas, keeping an explicit list of free slots.
///
/// The input is an immutable slice of sizes; the output is a [`SheetLayout`]
/// whose placements are indexed identically to the input. Packing the same
/// size sequence twice yields identical layouts.
pub struct GrowingPacker {
    max_side: u32,
}

impl Default for GrowingPacker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIDE)
    }
}

impl GrowingPacker {
    pub fn new(max_side: u32) -> Self {
        Self { max_side }
    }

    /// Packs `sizes` into a sheet of near-minimal area.
    ///
    /// Guarantees: placed rectangles are pairwise disjoint; the returned
    /// sheet is the tight bounding box of all placements. Errors with
    /// `Empty` on no input, `InvalidInput` on any zero dimension, and
    /// `Sizing` when the canvas cannot grow past `max_side` on either axis.
    pub fn pack(&self, sizes: &[(u32, u32)]) -> Result<SheetLayout> {
        if sizes.is_empty() {
            return Err(SpriteError::Empty);
        }
        for (i, &(w, h)) in sizes.iter().enumerate() {
            if w == 0 || h == 0 {
                return Err(SpriteError::InvalidInput(format!(
                    "rectangle {i} has zero area ({w}x{h})"
                )));
            }
            if w > self.max_side || h > self.max_side {
                return Err(SpriteError::Sizing {
                    width: w,
                    height: h,
                    max_side: self.max_side,
                });
            }
        }

        // Tallest first; the sort is stable, so equal heights keep input
        // order and the result is reproducible for a fixed input sequence.
        let mut order: Vec<usize> = (0..sizes.len()).collect();
        order.sort_by(|&a, &b| sizes[b].1.cmp(&sizes[a].1));

        let (w0, h0) = sizes[order[0]];
        let mut canvas = Canvas {
            width: w0,
            height: h0,
            free: vec![Rect::new(0, 0, w0, h0)],
            max_side: self.max_side,
        };

        let mut placements = vec![Offset { x: 0, y: 0 }; sizes.len()];
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        for &idx in &order {
            let (w, h) = sizes[idx];
            let slot = loop {
                if let Some(i) = canvas.choose(w, h) {
                    break i;
                }
                canvas.grow(w, h)?;
            };
            let at = canvas.place(slot, w, h);
            placements[idx] = at;
            max_x = max_x.max(at.x + w);
            max_y = max_y.max(at.y + h);
        }

        Ok(SheetLayout {
            width: max_x,
            height: max_y,
            placements,
        })
    }
}

struct Canvas {
    width: u32,
    height: u32,
    free: Vec<Rect>,
    max_side: u32,
}

impl Canvas {
    /// Smallest-area free slot that fits; ties go to the lowest index, and
    /// the free list is only ever mutated in index order, so selection is
    /// deterministic.
    fn choose(&self, w: u32, h: u32) -> Option<usize> {
        let mut best: Option<(u64, usize)> = None;
        for (i, fr) in self.free.iter().enumerate() {
            if !fr.fits(w, h) {
                continue;
            }
            let area = fr.area();
            if best.is_none_or(|(ba, _)| area < ba) {
                best = Some((area, i));
            }
        }
        best.map(|(_, i)| i)
    }

    /// Places a `w`x`h` rectangle at the origin of free slot `idx` and splits
    /// the leftover into up to two new slots: right of the placed rectangle
    /// (placed height) and below it (full slot width). The two are disjoint.
    fn place(&mut self, idx: usize, w: u32, h: u32) -> Offset {
        let slot = self.free.remove(idx);
        if slot.w > w {
            self.free.push(Rect::new(slot.x + w, slot.y, slot.w - w, h));
        }
        if slot.h > h {
            self.free
                .push(Rect::new(slot.x, slot.y + h, slot.w, slot.h - h));
        }
        Offset {
            x: slot.x,
            y: slot.y,
        }
    }

    /// Extends the canvas so a `w`x`h` rectangle can eventually land:
    /// growing right appends a full-height column slot, growing down a
    /// full-width shelf slot. Prefers the axis where the rectangle fits the
    /// new slot outright, then the currently smaller side. Every call
    /// strictly widens one axis, so repeated growth either fits the
    /// rectangle or hits the ceiling on both axes.
    fn grow(&mut self, w: u32, h: u32) -> Result<()> {
        let right_ok = self.width as u64 + w as u64 <= self.max_side as u64;
        let down_ok = self.height as u64 + h as u64 <= self.max_side as u64;
        let grow_right = match (right_ok, down_ok) {
            (false, false) => {
                return Err(SpriteError::Sizing {
                    width: self.width.saturating_add(w),
                    height: self.height.saturating_add(h),
                    max_side: self.max_side,
                });
            }
            (true, false) => true,
            (false, true) => false,
            (true, true) => match (h <= self.height, w <= self.width) {
                (true, false) => true,
                (false, true) => false,
                _ => self.width <= self.height,
            },
        };
        if grow_right {
            self.free.push(Rect::new(self.width, 0, w, self.height));
            self.width += w;
        } else {
            self.free.push(Rect::new(0, self.height, self.width, h));
            self.height += h;
        }
        debug!(
            width = self.width,
            height = self.height,
            "grew sheet canvas"
        );
        Ok(())
    }
}

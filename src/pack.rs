//! Rectangle packing seam.
//!
//! Layout only depends on the [`RectanglePacker`] contract: rectangles in,
//! the same rectangles annotated with `x`/`y` out. When a packed set does not
//! fit, the packer returns a best-effort placement; callers never re-validate
//! collision-freedom.

/// Canvas the tiles are packed onto.
#[derive(Clone, Copy, Debug)]
pub struct Container {
    pub width: u32,
    pub height: u32,
}

/// Packing input, one per visible track.
#[derive(Clone, Debug, PartialEq)]
pub struct Rect {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub volume: f64,
}

/// Packing output: the input rectangle plus its placement.
#[derive(Clone, Debug, PartialEq)]
pub struct PackedRect {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub volume: f64,
    pub x: f64,
    pub y: f64,
}

pub trait RectanglePacker {
    fn pack(&self, rects: &[Rect], container: Container, margin: u32, center: bool)
    -> Vec<PackedRect>;
}

/// Deterministic shelf packer: fills horizontal shelves left-to-right in the
/// order given, wrapping when a tile would cross the right edge. Shelves that
/// run past the bottom of the container stay where they land (best effort).
#[derive(Clone, Copy, Debug, Default)]
pub struct ShelfPacker;

impl RectanglePacker for ShelfPacker {
    fn pack(
        &self,
        rects: &[Rect],
        container: Container,
        margin: u32,
        center: bool,
    ) -> Vec<PackedRect> {
        let margin = f64::from(margin);
        let container_w = f64::from(container.width);

        // Split into shelves first so each one can be centered as a unit.
        let mut shelves: Vec<Vec<&Rect>> = Vec::new();
        let mut cursor_x = 0.0;
        for rect in rects {
            let w = f64::from(rect.width);
            let starts_new_shelf = shelves.is_empty() || cursor_x + w > container_w;
            if starts_new_shelf {
                shelves.push(Vec::new());
                cursor_x = 0.0;
            }
            shelves.last_mut().expect("shelf exists").push(rect);
            cursor_x += w + margin;
        }

        let shelf_heights: Vec<f64> = shelves
            .iter()
            .map(|shelf| {
                shelf
                    .iter()
                    .map(|r| f64::from(r.height))
                    .fold(0.0, f64::max)
            })
            .collect();
        let total_h: f64 = shelf_heights.iter().sum::<f64>()
            + margin * shelf_heights.len().saturating_sub(1) as f64;
        let offset_y = if center {
            ((f64::from(container.height) - total_h) / 2.0).max(0.0)
        } else {
            0.0
        };

        let mut placed = Vec::with_capacity(rects.len());
        let mut y = offset_y;
        for (shelf, shelf_h) in shelves.iter().zip(&shelf_heights) {
            let used: f64 = shelf.iter().map(|r| f64::from(r.width)).sum::<f64>()
                + margin * shelf.len().saturating_sub(1) as f64;
            let mut x = if center {
                ((container_w - used) / 2.0).max(0.0)
            } else {
                0.0
            };
            for rect in shelf {
                placed.push(PackedRect {
                    id: rect.id.clone(),
                    width: rect.width,
                    height: rect.height,
                    volume: rect.volume,
                    x,
                    y,
                });
                x += f64::from(rect.width) + margin;
            }
            y += shelf_h + margin;
        }
        placed
    }
}

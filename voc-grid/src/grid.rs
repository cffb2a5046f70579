//! Grid target encoding.
//!
//! Boxes are rescaled from the source image frame into a square canonical frame,
//! which is partitioned into `side × side` cells. The cell containing the box center
//! becomes responsible for the box. Each cell keeps at most one object, selected by
//! [CollisionPolicy].

use crate::{
    annotation::RawBox,
    bbox::{Transform, HW, TLBR},
    common::*,
    error::{Error, Result},
    label::ClassList,
};

/// Largest in-cell offset. A center on the far image edge is clamped to it.
///
/// It stays below 1 after conversion to `f32`.
pub const MAX_CELL_OFFSET: f64 = 1.0 - f32::EPSILON as f64;

/// Relative slack for boxes touching the frame edge after rescaling.
const EDGE_TOLERANCE: f64 = 1e-9;

/// The encoded position, size and class of an object within its cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxRecord {
    /// Center offset from the cell's left edge, in cell units, in `[0, 1)`.
    pub cell_x: f64,
    /// Center offset from the cell's top edge, in cell units, in `[0, 1)`.
    pub cell_y: f64,
    /// Square root of the box height relative to the canonical size, in `[0, 1]`.
    pub sqrt_h: f64,
    /// Square root of the box width relative to the canonical size, in `[0, 1]`.
    pub sqrt_w: f64,
    pub class_index: usize,
}

impl BoxRecord {
    /// Box area relative to the canonical frame area.
    pub fn relative_area(&self) -> f64 {
        (self.sqrt_h * self.sqrt_w).powi(2)
    }
}

/// Detection state of one grid cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridCell {
    has_object: bool,
    records: Vec<BoxRecord>,
}

impl GridCell {
    pub fn has_object(&self) -> bool {
        self.has_object
    }

    pub fn records(&self) -> &[BoxRecord] {
        &self.records
    }

    /// The record that contributes to the target vector.
    pub fn object(&self) -> Option<&BoxRecord> {
        self.records.first()
    }

    fn put(&mut self, record: BoxRecord) {
        self.has_object = true;
        self.records.clear();
        self.records.push(record);
    }
}

/// Policy for a box whose center falls in an occupied cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Keep the first box and drop later ones.
    FirstWins,
    /// Keep the box with the largest area.
    LargestWins,
    /// Fail with [Error::CellCollision].
    Reject,
}

impl Default for CollisionPolicy {
    fn default() -> Self {
        Self::FirstWins
    }
}

/// One sample's grid and image path.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedImage {
    image_path: PathBuf,
    side: usize,
    /// Cells in row-major order.
    cells: Vec<GridCell>,
}

impl AnnotatedImage {
    pub fn new(image_path: impl Into<PathBuf>, side: usize) -> Self {
        Self {
            image_path: image_path.into(),
            side,
            cells: vec![GridCell::default(); side * side],
        }
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn cell(&self, row: usize, col: usize) -> &GridCell {
        assert!(
            row < self.side && col < self.side,
            "cell ({}, {}) is out of a {}x{} grid",
            row,
            col,
            self.side,
            self.side
        );
        &self.cells[row * self.side + col]
    }

    fn cell_mut(&mut self, row: usize, col: usize) -> &mut GridCell {
        &mut self.cells[row * self.side + col]
    }

    /// Iterate over occupied cells in row-major order.
    pub fn objects(&self) -> impl Iterator<Item = (usize, usize, &BoxRecord)> + '_ {
        let side = self.side;
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(index, cell)| Some((index / side, index % side, cell.object()?)))
    }

    /// Length of the flattened target of a `side × side` grid.
    pub fn target_len(side: usize, num_classes: usize) -> usize {
        side * side * (num_classes + 5)
    }

    /// Flatten the grid into a target vector.
    ///
    /// Each cell contributes `[cell_x, cell_y, sqrt_h, sqrt_w, one-hot class, objectness]`,
    /// or zeros if it is empty.
    pub fn to_target(&self, num_classes: usize) -> Result<Array1<f32>> {
        let stride = num_classes + 5;
        let mut target = Array1::zeros(Self::target_len(self.side, num_classes));

        for (index, cell) in self.cells.iter().enumerate() {
            let record = match cell.object() {
                Some(record) => record,
                None => continue,
            };
            if record.class_index >= num_classes {
                return Err(Error::MalformedTarget(format!(
                    "class index {} exceeds the number of classes {}",
                    record.class_index, num_classes
                )));
            }

            let base = index * stride;
            target[base] = record.cell_x as f32;
            target[base + 1] = record.cell_y as f32;
            target[base + 2] = record.sqrt_h as f32;
            target[base + 3] = record.sqrt_w as f32;
            target[base + 4 + record.class_index] = 1.0;
            target[base + 4 + num_classes] = 1.0;
        }

        Ok(target)
    }
}

/// Encodes raw boxes into a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridEncoder {
    side: usize,
    canonical_size: f64,
    policy: CollisionPolicy,
}

impl GridEncoder {
    pub fn new(side: usize, canonical_size: f64, policy: CollisionPolicy) -> Result<Self> {
        if side == 0 {
            return Err(Error::InvalidConfig("side must be positive".into()));
        }
        if !(canonical_size.is_finite() && canonical_size > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "canonical_size must be positive, but get {}",
                canonical_size
            )));
        }

        Ok(Self {
            side,
            canonical_size,
            policy,
        })
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn canonical_size(&self) -> f64 {
        self.canonical_size
    }

    pub fn cell_size(&self) -> f64 {
        self.canonical_size / self.side as f64
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    /// Create an empty grid sized for this encoder.
    pub fn new_image(&self, image_path: impl Into<PathBuf>) -> AnnotatedImage {
        AnnotatedImage::new(image_path, self.side)
    }

    /// Encode boxes into the grid in iteration order.
    pub fn encode<'a>(
        &self,
        image: &mut AnnotatedImage,
        boxes: impl IntoIterator<Item = &'a RawBox>,
        source_size: &HW,
        classes: &ClassList,
    ) -> Result<()> {
        if image.side != self.side {
            return Err(Error::InvalidConfig(format!(
                "expect a {}x{} grid, but get {}x{}",
                self.side, self.side, image.side, image.side
            )));
        }

        for raw in boxes {
            let class_index = classes.index_of(&raw.class_name)?;
            let (row, col, record) = self.encode_box(&raw.rect, class_index, source_size)?;
            let cell = image.cell_mut(row, col);

            if !cell.has_object {
                cell.put(record);
                continue;
            }

            match self.policy {
                CollisionPolicy::FirstWins => {
                    trace!(
                        "drop '{}' box colliding in cell ({}, {})",
                        raw.class_name,
                        row,
                        col
                    );
                }
                CollisionPolicy::LargestWins => {
                    let larger = cell
                        .object()
                        .map(|prev| record.relative_area() > prev.relative_area())
                        .unwrap_or(true);
                    if larger {
                        cell.put(record);
                    }
                }
                CollisionPolicy::Reject => {
                    return Err(Error::CellCollision { row, col });
                }
            }
        }

        Ok(())
    }

    /// Compute the cell `(row, col)` and the record of a single box.
    pub fn encode_box(
        &self,
        rect: &TLBR,
        class_index: usize,
        source_size: &HW,
    ) -> Result<(usize, usize, BoxRecord)> {
        let canonical = self.canonical_size;
        let transform = Transform::from_sizes_exact(source_size, &HW::square(canonical)?)?;
        let rect = transform.apply(rect);

        let h = self.clamp_extent(rect.h(), "height")?;
        let w = self.clamp_extent(rect.w(), "width")?;
        let (row, cell_y) = self.locate(rect.cy(), "y")?;
        let (col, cell_x) = self.locate(rect.cx(), "x")?;

        let record = BoxRecord {
            cell_x,
            cell_y,
            sqrt_h: (h / canonical).sqrt(),
            sqrt_w: (w / canonical).sqrt(),
            class_index,
        };

        Ok((row, col, record))
    }

    fn clamp_extent(&self, extent: f64, what: &str) -> Result<f64> {
        let limit = self.canonical_size * (1.0 + EDGE_TOLERANCE);
        if !(0.0..=limit).contains(&extent) {
            return Err(Error::invalid_box(format!(
                "box {} {} is out of the canonical frame [0, {}]",
                what, extent, self.canonical_size
            )));
        }
        Ok(extent.min(self.canonical_size))
    }

    /// Map a canonical coordinate to the cell index and the offset within the cell.
    fn locate(&self, pos: f64, axis: &str) -> Result<(usize, f64)> {
        let canonical = self.canonical_size;
        let slack = canonical * EDGE_TOLERANCE;
        if !(-slack..=canonical + slack).contains(&pos) {
            return Err(Error::invalid_box(format!(
                "box center {}={} is out of the canonical frame [0, {}]",
                axis, pos, canonical
            )));
        }

        let cell_size = self.cell_size();
        let pos = pos.max(0.0);
        let index = (pos / cell_size).floor() as usize;

        if index >= self.side {
            return Ok((self.side - 1, MAX_CELL_OFFSET));
        }

        let offset = ((pos - index as f64 * cell_size) / cell_size).clamp(0.0, MAX_CELL_OFFSET);
        Ok((index, offset))
    }
}

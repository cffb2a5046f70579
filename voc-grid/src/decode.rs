//! Decoding of flattened target vectors back into boxes.

use crate::{
    common::*,
    error::{Error, Result},
    grid::{AnnotatedImage, GridEncoder},
    label::ClassList,
};

/// An object recovered from a target vector, in canonical frame pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedObject {
    pub row: usize,
    pub col: usize,
    pub class_index: usize,
    pub class_name: String,
    pub objectness: f32,
    pub cy: f64,
    pub cx: f64,
    pub h: f64,
    pub w: f64,
}

/// Decode the cells whose objectness exceeds 0.5.
///
/// The class is the arg-max of the one-hot slots, so the same decoder also works
/// on soft predictions laid out like a target.
pub fn decode_target(
    target: ArrayView1<f32>,
    encoder: &GridEncoder,
    classes: &ClassList,
) -> Result<Vec<DecodedObject>> {
    let side = encoder.side();
    let num_classes = classes.len();
    let stride = num_classes + 5;
    let expect_len = AnnotatedImage::target_len(side, num_classes);

    if target.len() != expect_len {
        return Err(Error::MalformedTarget(format!(
            "expect length {}, but get {}",
            expect_len,
            target.len()
        )));
    }

    let cell_size = encoder.cell_size();
    let canonical = encoder.canonical_size();

    (0..side * side)
        .filter_map(|index| {
            let base = index * stride;
            let objectness = target[base + 4 + num_classes];
            (objectness > 0.5).then(|| (index, base, objectness))
        })
        .map(|(index, base, objectness)| -> Result<_> {
            let (row, col) = (index / side, index % side);
            let cell_x = target[base] as f64;
            let cell_y = target[base + 1] as f64;
            let sqrt_h = target[base + 2] as f64;
            let sqrt_w = target[base + 3] as f64;

            let class_slots = target.slice(s![base + 4..base + 4 + num_classes]);

            // first maximum on ties
            let class_index = class_slots
                .iter()
                .position_min_by(|lhs, rhs| {
                    rhs.partial_cmp(lhs).unwrap_or(std::cmp::Ordering::Equal)
                })
                .ok_or_else(|| Error::MalformedTarget("empty class slots".into()))?;
            if class_slots[class_index] <= 0.0 {
                return Err(Error::MalformedTarget(format!(
                    "cell (row {}, col {}) has objectness {} but no class score",
                    row, col, objectness
                )));
            }
            let class_name = classes
                .name(class_index)
                .ok_or_else(|| {
                    Error::MalformedTarget(format!("class index {} is out of range", class_index))
                })?
                .to_owned();

            Ok(DecodedObject {
                row,
                col,
                class_index,
                class_name,
                objectness,
                cy: (row as f64 + cell_y) * cell_size,
                cx: (col as f64 + cell_x) * cell_size,
                h: sqrt_h.powi(2) * canonical,
                w: sqrt_w.powi(2) * canonical,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{annotation::RawBox, bbox::HW, grid::CollisionPolicy};
    use approx::assert_abs_diff_eq;

    #[test]
    fn decode_encoded_target() {
        let encoder = GridEncoder::new(7, 448.0, CollisionPolicy::FirstWins).unwrap();
        let classes = ClassList::voc();
        let boxes = [
            RawBox::new("dog", 100.0, 100.0, 300.0, 300.0).unwrap(),
            RawBox::new("tvmonitor", 0.0, 0.0, 40.0, 20.0).unwrap(),
        ];
        let mut image = encoder.new_image("dog.jpg");
        encoder
            .encode(
                &mut image,
                &boxes,
                &HW::try_from_hw([400.0, 400.0]).unwrap(),
                &classes,
            )
            .unwrap();
        let target = image.to_target(classes.len()).unwrap();

        let objects = decode_target(target.view(), &encoder, &classes).unwrap();
        assert_eq!(objects.len(), 2);

        // row-major order puts the top-left box first
        let tv = &objects[0];
        assert_eq!((tv.row, tv.col), (0, 0));
        assert_eq!(tv.class_name, "tvmonitor");
        assert_abs_diff_eq!(tv.cx, 22.4, epsilon = 1e-4);
        assert_abs_diff_eq!(tv.cy, 11.2, epsilon = 1e-4);
        assert_abs_diff_eq!(tv.w, 44.8, epsilon = 1e-4);
        assert_abs_diff_eq!(tv.h, 22.4, epsilon = 1e-4);

        let dog = &objects[1];
        assert_eq!((dog.row, dog.col), (3, 3));
        assert_eq!(dog.class_name, "dog");
        assert_abs_diff_eq!(dog.cx, 224.0, epsilon = 1e-3);
        assert_abs_diff_eq!(dog.h, 224.0, epsilon = 1e-3);
    }

    #[test]
    fn object_without_class_is_rejected() {
        let encoder = GridEncoder::new(7, 448.0, CollisionPolicy::FirstWins).unwrap();
        let mut target = Array1::<f32>::zeros(AnnotatedImage::target_len(7, 20));
        target[24] = 1.0;

        assert!(matches!(
            decode_target(target.view(), &encoder, &ClassList::voc()),
            Err(Error::MalformedTarget(_))
        ));
    }

    #[test]
    fn class_ties_pick_first_slot() {
        let encoder = GridEncoder::new(7, 448.0, CollisionPolicy::FirstWins).unwrap();
        let classes = ClassList::voc();
        let mut target = Array1::<f32>::zeros(AnnotatedImage::target_len(7, 20));
        target[4 + 2] = 0.4;
        target[4 + 19] = 0.4;
        target[24] = 0.9;

        let objects = decode_target(target.view(), &encoder, &classes).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].class_index, 2);
        assert_eq!(objects[0].class_name, "bird");
    }

    #[test]
    fn wrong_length_is_rejected() {
        let encoder = GridEncoder::new(7, 448.0, CollisionPolicy::FirstWins).unwrap();
        let target = Array1::<f32>::zeros(100);
        assert!(matches!(
            decode_target(target.view(), &encoder, &ClassList::voc()),
            Err(Error::MalformedTarget(_))
        ));
    }
}

//! PASCAL VOC annotation files.

use crate::{
    bbox::{HW, TLBR},
    common::*,
    error::{Error, LoadError, Result},
};

pub use voc_dataset::Annotation;

/// A class name and its box in source image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBox {
    pub class_name: String,
    pub rect: TLBR,
}

impl RawBox {
    pub fn new(
        class_name: impl Into<String>,
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
    ) -> Result<Self> {
        Ok(Self {
            class_name: class_name.into(),
            rect: TLBR::try_from_tlbr([ymin, xmin, ymax, xmax])?,
        })
    }
}

/// Read and parse one annotation file.
pub fn open(path: impl AsRef<Path>) -> Result<Annotation, LoadError> {
    let text = fs::read_to_string(path)?;
    parse(&text)
}

pub fn parse(text: &str) -> Result<Annotation, LoadError> {
    let annotation: Annotation = serde_xml_rs::from_str(text)?;
    Ok(annotation)
}

/// The source image size.
pub fn source_size(annotation: &Annotation) -> Result<HW> {
    let voc_dataset::Size { width, height, .. } = annotation.size;
    if width == 0 || height == 0 {
        return Err(Error::invalid_box(format!(
            "image size must be positive, but get {}x{}",
            width, height
        )));
    }
    HW::try_from_hw([height as f64, width as f64])
}

/// Boxes in document order. Fails on a box with inverted corners.
pub fn raw_boxes(annotation: &Annotation) -> Result<Vec<RawBox>> {
    annotation
        .object
        .iter()
        .map(|obj| {
            let voc_dataset::BndBox {
                xmin,
                ymin,
                xmax,
                ymax,
            } = obj.bndbox;
            RawBox::new(
                &obj.name,
                f64::from(xmin),
                f64::from(ymin),
                f64::from(xmax),
                f64::from(ymax),
            )
        })
        .try_collect()
}

//! Batch assembly from sample identifiers.

use crate::{
    annotation,
    common::*,
    error::{Error, LoadError, Result},
    grid::{AnnotatedImage, GridEncoder},
    label::ClassList,
    loader::ImageLoader,
};

/// Where images and annotations live under the dataset directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetLayout {
    pub root: PathBuf,
    #[serde(default = "default_image_dir")]
    pub image_dir: String,
    #[serde(default = "default_annotation_dir")]
    pub annotation_dir: String,
    #[serde(default = "default_image_extension")]
    pub image_extension: String,
}

impl DatasetLayout {
    /// The PASCAL VOC layout: `JPEGImages/<id>.jpg` and `Annotations/<id>.xml`.
    pub fn voc(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            image_dir: default_image_dir(),
            annotation_dir: default_annotation_dir(),
            image_extension: default_image_extension(),
        }
    }

    pub fn image_path(&self, id: &str) -> PathBuf {
        self.root
            .join(&self.image_dir)
            .join(format!("{}.{}", id, self.image_extension))
    }

    pub fn annotation_path(&self, id: &str) -> PathBuf {
        self.root
            .join(&self.annotation_dir)
            .join(format!("{}.xml", id))
    }
}

fn default_image_dir() -> String {
    "JPEGImages".into()
}

fn default_annotation_dir() -> String {
    "Annotations".into()
}

fn default_image_extension() -> String {
    "jpg".into()
}

/// Paired images and targets. Row `i` of both arrays belongs to `ids[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub ids: Vec<String>,
    /// `[batch, height, width, channels]`
    pub images: Array4<f32>,
    /// `[batch, side * side * (5 + num_classes)]`
    pub targets: Array2<f32>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Resolves sample identifiers into images and grid targets.
#[derive(Debug)]
pub struct BatchAssembler<L>
where
    L: ImageLoader,
{
    layout: DatasetLayout,
    encoder: GridEncoder,
    classes: ClassList,
    loader: L,
}

impl<L> BatchAssembler<L>
where
    L: ImageLoader,
{
    pub fn new(layout: DatasetLayout, encoder: GridEncoder, classes: ClassList, loader: L) -> Self {
        Self {
            layout,
            encoder,
            classes,
            loader,
        }
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    pub fn encoder(&self) -> &GridEncoder {
        &self.encoder
    }

    pub fn classes(&self) -> &ClassList {
        &self.classes
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn target_len(&self) -> usize {
        AnnotatedImage::target_len(self.encoder.side(), self.classes.len())
    }

    /// Load and encode the samples in the given order.
    ///
    /// The first failing sample aborts the whole batch.
    pub fn assemble(&self, ids: &[String]) -> Result<Batch> {
        let (height, width, channels) = self.loader.output_shape();
        let mut images = Array4::zeros((ids.len(), height, width, channels));
        let mut targets = Array2::zeros((ids.len(), self.target_len()));

        for (index, id) in ids.iter().enumerate() {
            let (image, target) = self.load_sample(id).map_err(|err| {
                warn!("sample '{}' failed: {}", id, err);
                err
            })?;
            images.index_axis_mut(Axis(0), index).assign(&image);
            targets.index_axis_mut(Axis(0), index).assign(&target);
        }

        debug!("assembled a batch of {} samples", ids.len());

        Ok(Batch {
            ids: ids.to_vec(),
            images,
            targets,
        })
    }

    /// Parse the annotation of a sample and encode it into a grid.
    pub fn encode_sample(&self, id: &str) -> Result<AnnotatedImage> {
        let document = annotation::open(self.layout.annotation_path(id))
            .map_err(|source| sample_load_error(id, source))?;
        let source_size = annotation::source_size(&document)?;
        let boxes = annotation::raw_boxes(&document)?;

        let mut image = self.encoder.new_image(self.layout.image_path(id));
        self.encoder
            .encode(&mut image, &boxes, &source_size, &self.classes)?;

        trace!(
            "sample '{}' has {} boxes in {} cells",
            id,
            boxes.len(),
            image.objects().count()
        );

        Ok(image)
    }

    /// Load the image and the target vector of a sample.
    pub fn load_sample(&self, id: &str) -> Result<(Array3<f32>, Array1<f32>)> {
        let annotated = self.encode_sample(id)?;
        let target = annotated.to_target(self.classes.len())?;

        let image = self
            .loader
            .load(annotated.image_path())
            .map_err(|source| sample_load_error(id, source))?;

        let expect = self.loader.output_shape();
        if image.dim() != expect {
            return Err(sample_load_error(
                id,
                LoadError::Shape {
                    expect,
                    actual: image.dim(),
                },
            ));
        }

        Ok((image, target))
    }
}

fn sample_load_error(id: &str, source: LoadError) -> Error {
    Error::SampleLoad {
        id: id.to_owned(),
        source,
    }
}

//! Grid target encoding and training batch generation for single-shot grid detectors.
//!
//! A sample is a PASCAL VOC style annotation plus its JPEG image. Boxes are rescaled
//! into a canonical square frame, assigned to one cell of a `side × side` grid and
//! flattened into a fixed-length target vector. [BatchGenerator] walks a shuffled
//! [SamplePool] epoch after epoch and yields paired image and target arrays.

mod common;
pub mod annotation;
pub mod assembler;
pub mod bbox;
pub mod config;
pub mod decode;
pub mod error;
pub mod generator;
pub mod grid;
pub mod label;
pub mod loader;
pub mod pool;

pub use annotation::{Annotation, RawBox};
pub use assembler::{Batch, BatchAssembler, DatasetLayout};
pub use config::Config;
pub use decode::{decode_target, DecodedObject};
pub use error::{Error, LoadError, Result};
pub use generator::{BatchGenerator, GeneratorConfig, GeneratorState};
pub use grid::{AnnotatedImage, BoxRecord, CollisionPolicy, GridCell, GridEncoder};
pub use label::{ClassList, VOC_CLASSES};
pub use loader::{ImageLoader, ResizeCropLoader};
pub use pool::{EpochPlan, RemainderPolicy, SamplePool};

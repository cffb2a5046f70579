//! Configuration file format.

use crate::{
    assembler::{BatchAssembler, DatasetLayout},
    common::*,
    error::{Error, Result},
    generator::BatchGenerator,
    grid::{CollisionPolicy, GridEncoder},
    label::ClassList,
    loader::ResizeCropLoader,
    pool::SamplePool,
};

pub use crate::generator::GeneratorConfig;

/// The main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    pub generator: GeneratorConfig,
}

/// Dataset location and layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// The file listing sample identifiers, one per line.
    pub sample_pool_file: PathBuf,
    /// Class names, one per line. The PASCAL VOC classes are used if unset.
    #[serde(default)]
    pub classes_file: Option<PathBuf>,
    #[serde(flatten)]
    pub layout: DatasetLayout,
}

/// Grid encoding options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    #[serde(default = "default_side")]
    pub side: usize,
    #[serde(default = "default_canonical_size")]
    pub canonical_size: f64,
    #[serde(default)]
    pub collision_policy: CollisionPolicy,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            side: default_side(),
            canonical_size: default_canonical_size(),
            collision_policy: CollisionPolicy::default(),
        }
    }
}

fn default_side() -> usize {
    7
}

fn default_canonical_size() -> f64 {
    448.0
}

/// Image loading options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// The square size images are resized to before cropping.
    #[serde(default = "default_resize_size")]
    pub resize_size: usize,
    /// The square size of the center crop.
    #[serde(default = "default_image_size")]
    pub image_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            resize_size: default_resize_size(),
            image_size: default_image_size(),
        }
    }
}

fn default_resize_size() -> usize {
    512
}

fn default_image_size() -> usize {
    448
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(Error::io(path))?;
        let config: Self = json5::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_owned(),
            source,
        })?;

        // fail early on inconsistent sizes
        config.encoder()?;
        config.loader()?;

        Ok(config)
    }

    pub fn classes(&self) -> Result<ClassList> {
        match &self.dataset.classes_file {
            Some(path) => ClassList::load(path),
            None => Ok(ClassList::voc()),
        }
    }

    pub fn encoder(&self) -> Result<GridEncoder> {
        let EncoderConfig {
            side,
            canonical_size,
            collision_policy,
        } = self.encoder;
        GridEncoder::new(side, canonical_size, collision_policy)
    }

    pub fn loader(&self) -> Result<ResizeCropLoader> {
        let LoaderConfig {
            resize_size,
            image_size,
        } = self.loader;
        ResizeCropLoader::new(resize_size, image_size)
    }

    pub fn assembler(&self) -> Result<BatchAssembler<ResizeCropLoader>> {
        Ok(BatchAssembler::new(
            self.dataset.layout.clone(),
            self.encoder()?,
            self.classes()?,
            self.loader()?,
        ))
    }

    pub fn sample_pool(&self) -> Result<SamplePool> {
        SamplePool::open(&self.dataset.sample_pool_file)
    }

    /// Build the batch generator with the configured seed.
    pub fn generator(&self) -> Result<BatchGenerator<ResizeCropLoader, StdRng>> {
        let rng = match self.generator.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        BatchGenerator::new(
            self.assembler()?,
            self.sample_pool()?,
            &self.generator,
            rng,
        )
    }
}

//! Common imports from external crates.

pub use image::{imageops::FilterType, Rgb, RgbImage};
pub use indexmap::IndexSet;
pub use itertools::Itertools;
pub use log::{debug, info, trace, warn};
pub use ndarray::{s, Array1, Array2, Array3, Array4, ArrayView1, ArrayView3, Axis};
pub use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
pub use serde::{Deserialize, Serialize};
pub use std::{
    fmt::Debug,
    fs, io,
    io::{BufWriter, Write},
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

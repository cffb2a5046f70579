//! Image loading.

use crate::{
    common::*,
    error::{Error, LoadError, Result},
};

/// Loads an image file into a `[height, width, channels]` array.
pub trait ImageLoader
where
    Self: Debug,
{
    /// The `(height, width, channels)` shape of every loaded image.
    fn output_shape(&self) -> (usize, usize, usize);

    fn load(&self, path: &Path) -> Result<Array3<f32>, LoadError>;
}

/// Resizes the image exactly to `resize_size` squared, then crops the center
/// `image_size` squared region. Pixels are RGB scaled to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeCropLoader {
    resize_size: usize,
    image_size: usize,
}

impl ResizeCropLoader {
    pub fn new(resize_size: usize, image_size: usize) -> Result<Self> {
        if image_size == 0 {
            return Err(Error::InvalidConfig("image_size must be positive".into()));
        }
        if image_size > resize_size {
            return Err(Error::InvalidConfig(format!(
                "image_size {} must not exceed resize_size {}",
                image_size, resize_size
            )));
        }

        Ok(Self {
            resize_size,
            image_size,
        })
    }

    pub fn resize_size(&self) -> usize {
        self.resize_size
    }

    pub fn image_size(&self) -> usize {
        self.image_size
    }

    fn resize_and_crop(&self, source: &image::DynamicImage) -> RgbImage {
        let resize = self.resize_size as u32;
        let size = self.image_size as u32;
        let offset = (resize - size) / 2;

        let resized = source
            .resize_exact(resize, resize, FilterType::Triangle)
            .to_rgb8();
        image::imageops::crop_imm(&resized, offset, offset, size, size).to_image()
    }
}

impl ImageLoader for ResizeCropLoader {
    fn output_shape(&self) -> (usize, usize, usize) {
        (self.image_size, self.image_size, 3)
    }

    fn load(&self, path: &Path) -> Result<Array3<f32>, LoadError> {
        let image = image::open(path)?;
        let cropped = self.resize_and_crop(&image);
        Ok(rgb_to_array(&cropped))
    }
}

/// Convert an RGB image into a `[height, width, 3]` array in `[0, 1]`.
pub fn rgb_to_array(image: &RgbImage) -> Array3<f32> {
    let (width, height) = image.dimensions();
    Array3::from_shape_fn((height as usize, width as usize, 3), |(y, x, c)| {
        image.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0
    })
}

/// Convert a `[height, width, 3]` array in `[0, 1]` back into an RGB image.
pub fn array_to_rgb(array: ArrayView3<f32>) -> RgbImage {
    let (height, width, _) = array.dim();
    RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let channel = |c: usize| (array[[y, x, c]].clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgb([channel(0), channel(1), channel(2)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn invalid_sizes() {
        assert!(ResizeCropLoader::new(512, 0).is_err());
        assert!(ResizeCropLoader::new(448, 512).is_err());
        assert!(ResizeCropLoader::new(512, 448).is_ok());
    }

    #[test]
    fn load_resized_center_crop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.png");

        // left half red, right half blue
        let image = RgbImage::from_fn(40, 20, |x, _| {
            if x < 20 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        image.save(&path).unwrap();

        let loader = ResizeCropLoader::new(32, 16).unwrap();
        let array = loader.load(&path).unwrap();
        assert_eq!(array.dim(), (16, 16, 3));
        assert_eq!(array.dim(), loader.output_shape());

        assert_abs_diff_eq!(array[[8, 0, 0]], 1.0, epsilon = 1e-2);
        assert_abs_diff_eq!(array[[8, 0, 2]], 0.0, epsilon = 1e-2);
        assert_abs_diff_eq!(array[[8, 15, 0]], 0.0, epsilon = 1e-2);
        assert_abs_diff_eq!(array[[8, 15, 2]], 1.0, epsilon = 1e-2);
        assert!(array.iter().all(|&value| (0.0..=1.0).contains(&value)));
    }

    #[test]
    fn missing_file_fails() {
        let loader = ResizeCropLoader::new(32, 16).unwrap();
        assert!(loader.load(Path::new("/nonexistent/image.jpg")).is_err());
    }

    #[test]
    fn array_image_conversion() {
        let image = RgbImage::from_fn(3, 2, |x, y| Rgb([x as u8 * 50, y as u8 * 100, 255]));
        let array = rgb_to_array(&image);
        assert_eq!(array.dim(), (2, 3, 3));
        assert_eq!(array_to_rgb(array.view()), image);
    }
}

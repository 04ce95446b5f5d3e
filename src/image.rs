// image.rs — Runtime-sized 2D grid, generic over pixel type.
//
// Every intermediate of the enhancer is one of these:
//
//   Image<u8>    raw sample intensities
//   Image<f32>   normalized / filtered / orientation values
//   Image<bool>  ROI mask, binarized ridges, skeleton
//
// Storage is row-major and contiguous with no padding; pixel (x, y) lives
// at index y * width + x. x is the column, y the row (y grows downward).

use std::fmt;

/// Grid cell type. Block statistics and convolutions read every grid as
/// raw f32 values through `to_f32`.
pub trait Pixel: Copy + Default + Send + Sync + PartialOrd + 'static {
    fn to_f32(self) -> f32;
}

impl Pixel for u8 {
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Pixel for f32 {
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
}

// Binary grids. `true` converts to 1.0 so block statistics and convolution
// work on masks without a separate code path.
impl Pixel for bool {
    #[inline]
    fn to_f32(self) -> f32 {
        if self {
            1.0
        } else {
            0.0
        }
    }
}

/// A 2D image with runtime dimensions, generic over pixel type `T`.
#[derive(Clone, PartialEq)]
pub struct Image<T: Pixel> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T: Pixel> Image<T> {
    /// Create a default-initialized image (0, 0.0 or false everywhere).
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, T::default())
    }

    /// Create an image with every pixel set to `value`.
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Image {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    /// Create an image from an existing pixel vector in row-major order.
    ///
    /// # Panics
    /// Panics if `data.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "data length ({}) must equal width * height ({})",
            data.len(),
            width * height,
        );
        Image {
            data,
            width,
            height,
        }
    }

    /// Build an image by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Image {
            data,
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of pixels.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the pixel value at (x, y).
    ///
    /// # Panics
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.bounds_check(x, y);
        self.data[y * self.width + x]
    }

    /// Signed lookup for neighborhood walks: `None` outside the image.
    #[inline]
    pub fn get_signed(&self, x: isize, y: isize) -> Option<T> {
        if self.contains(x, y) {
            Some(self.data[y as usize * self.width + x as usize])
        } else {
            None
        }
    }

    /// Whether (x, y) lies inside the image.
    #[inline]
    pub fn contains(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Get pixel value without bounds checking.
    ///
    /// # Safety
    /// Caller must guarantee x < width and y < height.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, x: usize, y: usize) -> T {
        debug_assert!(
            x < self.width && y < self.height,
            "get_unchecked({x},{y}) out of bounds for {}x{}",
            self.width,
            self.height
        );
        *self.data.get_unchecked(y * self.width + x)
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.bounds_check(x, y);
        self.data[y * self.width + x] = value;
    }

    /// Iterate over all pixels as `(x, y, value)` in raster order.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        let w = self.width;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, &v)| (i % w, i / w, v))
    }

    /// Apply `f` to every pixel, producing a new image of another type.
    pub fn map<U: Pixel>(&self, f: impl Fn(T) -> U) -> Image<U> {
        Image {
            data: self.data.iter().map(|&v| f(v)).collect(),
            width: self.width,
            height: self.height,
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    #[inline]
    fn bounds_check(&self, x: usize, y: usize) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for image {}×{}",
            self.width,
            self.height,
        );
    }
}

impl Image<bool> {
    /// Number of set pixels.
    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Signed lookup that treats everything outside the image as unset.
    #[inline]
    pub fn is_set(&self, x: isize, y: isize) -> bool {
        self.get_signed(x, y).unwrap_or(false)
    }
}

// Grids are hundreds of pixels wide; Debug prints the shape and a value
// summary instead of the pixels.
impl<T: Pixel + fmt::Debug> fmt::Debug for Image<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (mut lo, mut hi) = (f32::INFINITY, f32::NEG_INFINITY);
        for &v in &self.data {
            lo = lo.min(v.to_f32());
            hi = hi.max(v.to_f32());
        }
        f.debug_struct("Image")
            .field("pixel", &std::any::type_name::<T>())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("range", &(lo..=hi))
            .finish()
    }
}

/// Bilinear sample of an f32 grid at a sub-pixel position, used when the
/// frequency estimator walks a rotated window.
///
/// Positions past the border clamp to the edge pixel.
///
/// # Panics
/// Panics if the image is empty.
pub fn interpolate_bilinear(img: &Image<f32>, x: f32, y: f32) -> f32 {
    assert!(!img.is_empty(), "cannot sample an empty image");

    let x = x.clamp(0.0, (img.width() - 1) as f32);
    let y = y.clamp(0.0, (img.height() - 1) as f32);
    let (left, top) = (x.floor() as usize, y.floor() as usize);
    let right = (left + 1).min(img.width() - 1);
    let bottom = (top + 1).min(img.height() - 1);
    let (tx, ty) = (x - left as f32, y - top as f32);

    // SAFETY: left, right < width and top, bottom < height after clamping.
    let (upper, lower) = unsafe {
        (
            img.get_unchecked(left, top) + tx * (img.get_unchecked(right, top) - img.get_unchecked(left, top)),
            img.get_unchecked(left, bottom) + tx * (img.get_unchecked(right, bottom) - img.get_unchecked(left, bottom)),
        )
    };
    upper + ty * (lower - upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grids_are_empty() {
        let raw: Image<u8> = Image::new(256, 288);
        assert_eq!((raw.width(), raw.height(), raw.len()), (256, 288, 256 * 288));
        assert!(raw.pixels().all(|(_, _, v)| v == 0));

        let roi: Image<bool> = Image::new(16, 16);
        assert_eq!(roi.count_set(), 0);
    }

    #[test]
    fn test_row_major_layout() {
        let img = Image::from_vec(3, 2, vec![10u8, 11, 12, 20, 21, 22]);
        assert_eq!(img.get(2, 0), 12);
        assert_eq!(img.get(0, 1), 20);
        let raster: Vec<(usize, usize, u8)> = img.pixels().collect();
        assert_eq!(raster[3], (0, 1, 20));
        assert_eq!(img.into_vec(), vec![10, 11, 12, 20, 21, 22]);
    }

    #[test]
    fn test_from_fn_and_set() {
        let mut img = Image::from_fn(6, 4, |x, y| (x + 10 * y) as f32);
        assert_eq!(img.get(5, 3), 35.0);
        img.set(5, 3, -1.0);
        assert_eq!(img.as_slice()[23], -1.0);
    }

    #[test]
    fn test_mask_outside_is_unset() {
        let mut roi: Image<bool> = Image::new(5, 5);
        roi.set(4, 4, true);
        assert!(roi.is_set(4, 4));
        assert!(!roi.is_set(5, 4));
        assert!(!roi.is_set(-1, -1));
        assert_eq!(roi.get_signed(4, 5), None);
        assert!(roi.contains(0, 0) && !roi.contains(0, -1));
    }

    #[test]
    fn test_pixel_values() {
        assert_eq!(200u8.to_f32(), 200.0);
        assert_eq!(true.to_f32(), 1.0);
        assert_eq!(false.to_f32(), 0.0);
    }

    #[test]
    fn test_threshold_with_map() {
        let img = Image::from_vec(4, 1, vec![-0.5f32, 0.2, 0.0, 3.0]);
        let ridges = img.map(|v| v > 0.0);
        assert_eq!(ridges.as_slice(), &[false, true, false, true]);
    }

    #[test]
    fn test_debug_summarizes() {
        let img = Image::from_vec(2, 2, vec![3u8, 9, 1, 4]);
        let text = format!("{img:?}");
        assert!(text.contains("width: 2") && text.contains("1.0..=9.0"), "{text}");
    }

    #[test]
    fn test_bilinear_samples() {
        let img = Image::from_vec(2, 2, vec![0.0f32, 10.0, 20.0, 30.0]);
        assert!((interpolate_bilinear(&img, 0.5, 0.5) - 15.0).abs() < 1e-6);
        assert!((interpolate_bilinear(&img, 1.0, 0.25) - 15.0).abs() < 1e-6);
        // Clamped past the border.
        assert_eq!(interpolate_bilinear(&img, 4.0, 4.0), 30.0);
        assert_eq!(interpolate_bilinear(&img, -2.0, 0.0), 0.0);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_get_out_of_bounds() {
        let img: Image<u8> = Image::new(4, 4);
        img.get(0, 4);
    }

    #[test]
    #[should_panic(expected = "data length")]
    fn test_from_vec_wrong_length() {
        let _ = Image::from_vec(256, 288, vec![0u8; 256 * 144]);
    }
}

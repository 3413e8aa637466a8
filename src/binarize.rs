//! Greyscale conversion and intensity thresholding.
//!
//! Two masks come out of the same image: a lightly blurred one for component
//! labelling (blur joins anti-aliased strokes) and an unblurred one for the
//! row statistics (blur would wash out the transition counts).

use image::{imageops, DynamicImage, GrayImage, Luma, Rgb, RgbImage};

/// Threshold for the blurred mask used by the component labeler.
pub const COMPONENT_THRESHOLD: u8 = 240;
/// Blur applied before component thresholding.
pub const COMPONENT_BLUR_SIGMA: f32 = 0.6;
/// Threshold for the unblurred mask used by the row profiler.
pub const PROFILE_THRESHOLD: u8 = 233;

/// Boolean ink/background grid, `true` where the pixel is darker than the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InkMask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl InkMask {
    /// Build a mask from raw cells laid out row-major.
    ///
    /// # Panics
    ///
    /// Panics if `cells.len() != width * height`.
    #[must_use]
    pub fn from_cells(width: u32, height: u32, cells: Vec<bool>) -> Self {
        assert_eq!(cells.len(), width as usize * height as usize);
        Self {
            width,
            height,
            cells,
        }
    }

    /// Mask width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Mask height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether `(x, y)` is ink. Out-of-range coordinates are background.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.cells[self.index(x, y)]
    }

    /// Row-major index of `(x, y)`.
    #[must_use]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Raw row-major cells.
    #[must_use]
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// One row of cells.
    #[must_use]
    pub fn row(&self, y: u32) -> &[bool] {
        let start = self.index(0, y);
        &self.cells[start..start + self.width as usize]
    }

    /// Fraction of ink cells inside `[x0, x1) × [y0, y1)`, clipped to the mask.
    #[must_use]
    pub fn density(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> f32 {
        let (x1, y1) = (x1.min(self.width), y1.min(self.height));
        if x0 >= x1 || y0 >= y1 {
            return 0.0;
        }
        let mut ink = 0usize;
        for y in y0..y1 {
            let row = self.row(y);
            ink += row[x0 as usize..x1 as usize].iter().filter(|&&c| c).count();
        }
        let total = (x1 - x0) as usize * (y1 - y0) as usize;
        #[allow(clippy::cast_precision_loss)]
        {
            ink as f32 / total as f32
        }
    }
}

/// Luma of one RGB pixel: `0.299*R + 0.587*G + 0.114*B`, rounded.
#[must_use]
pub fn luma(px: Rgb<u8>) -> u8 {
    let lum = 0.299 * f32::from(px[0]) + 0.587 * f32::from(px[1]) + 0.114 * f32::from(px[2]);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        lum.round().clamp(0.0, 255.0) as u8
    }
}

/// Convert an RGB image to greyscale using [`luma`].
#[must_use]
pub fn to_grey(img: &RgbImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        Luma([luma(*img.get_pixel(x, y))])
    })
}

/// Normalise any decoded image to opaque 8-bit RGB.
///
/// Transparent pixels are composited over white so that no residual alpha
/// survives into the pipeline.
#[must_use]
pub fn flatten_to_rgb(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let px = rgba.get_pixel(x, y);
        let alpha = f32::from(px[3]) / 255.0;
        let mut out = [0u8; 3];
        for ch in 0..3 {
            let v = f32::from(px[ch]) * alpha + 255.0 * (1.0 - alpha);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                out[ch] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
        Rgb(out)
    })
}

/// Threshold a greyscale image: `ink = grey < threshold`.
#[must_use]
pub fn binarize(grey: &GrayImage, threshold: u8) -> InkMask {
    let cells = grey.as_raw().iter().map(|&v| v < threshold).collect();
    InkMask::from_cells(grey.width(), grey.height(), cells)
}

/// Blur lightly, then threshold. Used for connectivity analysis.
#[must_use]
pub fn binarize_blurred(grey: &GrayImage, sigma: f32, threshold: u8) -> InkMask {
    if sigma <= 0.0 {
        return binarize(grey, threshold);
    }
    let blurred = imageops::blur(grey, sigma);
    binarize(&blurred, threshold)
}

/// The mask the component labeler and the growth pass work on.
#[must_use]
pub fn component_mask(grey: &GrayImage) -> InkMask {
    binarize_blurred(grey, COMPONENT_BLUR_SIGMA, COMPONENT_THRESHOLD)
}

//! Producing the cleaned raster from a [`SafeZone`].
//!
//! Two strategies are supported:
//! - **Hard repaint**: everything outside the zone is filled with a flat color.
//! - **Feathered composite**: a blurred zone mask blends the original over a
//!   synthesized background, hiding the seam.
//!
//! Both return an opaque RGB image with the input's dimensions.

use image::{imageops, GrayImage, Luma, Rgb, RgbImage};

use crate::geometry::{Rect, SafeZone};

/// Default feather radius as a fraction of `min(W, H)`.
pub const DEFAULT_FEATHER_FRACTION: f32 = 0.012;
/// Default sigma for the blurred background.
pub const DEFAULT_BACKGROUND_SIGMA: f32 = 40.0;
/// Smallest feather sigma in pixels.
const MIN_FEATHER: f32 = 2.0;

/// Background synthesized behind the feathered composite.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Background {
    /// Flat color averaged from the pixels outside the zone.
    #[default]
    Solid,
    /// Heavily blurred copy of the original.
    Blurred {
        /// Gaussian sigma in pixels.
        sigma: f32,
    },
}

/// How the area outside the safe zone is removed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    /// Fill the four outside strips with a flat color.
    HardRepaint {
        /// Fill color.
        fill: Rgb<u8>,
    },
    /// Blend the original over a background through a feathered mask.
    Feathered {
        /// Feather sigma as a fraction of `min(W, H)`.
        feather_fraction: f32,
        /// Background layer.
        background: Background,
    },
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Feathered {
            feather_fraction: DEFAULT_FEATHER_FRACTION,
            background: Background::Solid,
        }
    }
}

impl Strategy {
    /// Hard repaint with a white fill.
    #[must_use]
    pub fn hard() -> Self {
        Strategy::HardRepaint {
            fill: Rgb([255, 255, 255]),
        }
    }
}

/// Apply `strategy` and return the cleaned image.
#[must_use]
pub fn composite(image: &RgbImage, zone: &SafeZone, strategy: &Strategy) -> RgbImage {
    match *strategy {
        Strategy::HardRepaint { fill } => hard_repaint(image, zone, fill),
        Strategy::Feathered {
            feather_fraction,
            background,
        } => feathered(image, zone, feather_fraction, background),
    }
}

/// The four regions outside the zone: top, bottom, left, right.
///
/// Top and bottom span the full width; left and right only the zone's rows,
/// so the regions never overlap. Empty regions are omitted.
#[must_use]
pub fn outside_regions(zone: &SafeZone, width: u32, height: u32) -> Vec<Rect> {
    let r = zone.rect();
    [
        Rect::new(0, 0, width, r.y),
        Rect::new(0, r.y2, width, height),
        Rect::new(0, r.y, r.x, r.y2),
        Rect::new(r.x2, r.y, width, r.y2),
    ]
    .into_iter()
    .filter(|region| !region.is_empty())
    .collect()
}

/// Fill everything outside the zone with `fill`; pixels inside are untouched.
#[must_use]
pub fn hard_repaint(image: &RgbImage, zone: &SafeZone, fill: Rgb<u8>) -> RgbImage {
    let mut out = image.clone();
    for region in outside_regions(zone, image.width(), image.height()) {
        for y in region.y..region.y2 {
            for x in region.x..region.x2 {
                out.put_pixel(x, y, fill);
            }
        }
    }
    out
}

/// Mean of the per-region mean colors of the outside regions.
///
/// Returns white when the zone covers the whole image.
#[must_use]
pub fn ring_color(image: &RgbImage, zone: &SafeZone) -> Rgb<u8> {
    let regions = outside_regions(zone, image.width(), image.height());
    if regions.is_empty() {
        return Rgb([255, 255, 255]);
    }

    let mut acc = [0.0_f64; 3];
    for region in &regions {
        let mut sum = [0u64; 3];
        for y in region.y..region.y2 {
            for x in region.x..region.x2 {
                let px = image.get_pixel(x, y);
                for ch in 0..3 {
                    sum[ch] += u64::from(px[ch]);
                }
            }
        }
        let n = f64::from(region.width()) * f64::from(region.height());
        for ch in 0..3 {
            #[allow(clippy::cast_precision_loss)]
            {
                acc[ch] += sum[ch] as f64 / n;
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let count = regions.len() as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Rgb(acc.map(|v| (v / count).round().clamp(0.0, 255.0) as u8))
}

/// Feather sigma in pixels for an image of the given size.
#[must_use]
pub fn feather_sigma(width: u32, height: u32, fraction: f32) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let short = width.min(height) as f32;
    (short * fraction.max(0.0)).round().max(MIN_FEATHER)
}

/// Opaque inside the zone, transparent outside, blurred by `sigma`.
#[must_use]
pub fn feather_mask(width: u32, height: u32, zone: &SafeZone, sigma: f32) -> GrayImage {
    let hard = GrayImage::from_fn(width, height, |x, y| {
        Luma([if zone.contains(x, y) { 255 } else { 0 }])
    });
    imageops::blur(&hard, sigma)
}

/// Blend the original over a synthesized background through a feathered mask.
#[must_use]
pub fn feathered(
    image: &RgbImage,
    zone: &SafeZone,
    feather_fraction: f32,
    background: Background,
) -> RgbImage {
    let (w, h) = image.dimensions();
    let sigma = feather_sigma(w, h, feather_fraction);
    let alpha = feather_mask(w, h, zone, sigma);

    let backdrop = match background {
        Background::Solid => RgbImage::from_pixel(w, h, ring_color(image, zone)),
        Background::Blurred { sigma } => imageops::blur(image, sigma.max(0.1)),
    };

    RgbImage::from_fn(w, h, |x, y| {
        let a = f32::from(alpha.get_pixel(x, y)[0]) / 255.0;
        let fg = image.get_pixel(x, y);
        let bg = backdrop.get_pixel(x, y);
        let mut out = [0u8; 3];
        for ch in 0..3 {
            let v = f32::from(bg[ch]) * (1.0 - a) + f32::from(fg[ch]) * a;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                out[ch] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
        Rgb(out)
    })
}

//! Isolate generated logo artwork and strip injected captions and watermark text.
//!
//! Image generators often add a caption, a tagline or a faint watermark under
//! the logo they were asked for. This crate finds the *safe zone* that holds
//! the actual artwork and removes everything outside it, either by repainting
//! or by a feathered composite over a synthesized background.
//!
//! # Quick Start
//!
//! ```no_run
//! use logo_cleanup::{CleanOptions, CleanupEngine};
//!
//! let engine = CleanupEngine::new();
//! let img = image::open("logo.png").unwrap();
//! let cleaned = engine.clean(&img, &CleanOptions::default()).unwrap();
//! cleaned.save("logo_clean.png").unwrap();
//! ```
//!
//! # Text detection
//!
//! Pixel statistics alone work for most images. An OCR backend can be plugged
//! in through [`TextDetector`]; its boxes let the engine keep wide slogan lines
//! and cut bottom captions more precisely. Detector failures and timeouts are
//! logged and otherwise ignored.
//!
//! ```no_run
//! use std::sync::Arc;
//! use image::RgbImage;
//! use logo_cleanup::{
//!     CleanOptions, CleanupEngine, DetectorError, RawTextRecord, SegmentationMode,
//!     TextDetector, TextRegionDetector,
//! };
//!
//! struct NoText;
//!
//! impl TextDetector for NoText {
//!     fn recognize(
//!         &self,
//!         _image: &RgbImage,
//!         _mode: SegmentationMode,
//!     ) -> Result<Vec<RawTextRecord>, DetectorError> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! let engine = CleanupEngine::with_detector(TextRegionDetector::new(Arc::new(NoText)));
//! let img = image::open("logo.png").unwrap();
//! let (_, report) = engine.clean_with_report(&img, &CleanOptions::default()).unwrap();
//! println!("kept {:?}", report.analysis.safe_zone);
//! ```

#![deny(missing_docs)]

pub mod binarize;
pub mod components;
pub mod composite;
mod engine;
pub mod error;
pub mod geometry;
pub mod profile;
pub mod safe_zone;
pub mod suppress;
pub mod text;

pub use composite::{Background, Strategy};
pub use engine::{
    default_output_path, is_supported_image, save_image, CleanOptions, CleanReport,
    CleanupEngine, DetectorOutcome, ProcessResult, SafeZoneAnalysis,
};
pub use error::{DetectorError, Error, Result};
pub use geometry::{Rect, SafeZone};
pub use text::{
    DetectorOptions, RawTextRecord, SegmentationMode, TextBox, TextDetector, TextRegionDetector,
};

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use thiserror::Error;

use crate::artifact::ImageArtifact;
use crate::geometry::{DisplayRect, DisplaySize, ImageBounds, ScaleFactors};

/// Share of the displayed width a freshly centred aspect selection covers.
const CENTERED_SELECTION_WIDTH: f64 = 0.9;

#[derive(Debug, Error)]
pub enum CropError {
    #[error("could not decode the current image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("could not encode the cropped image: {0}")]
    Encode(#[source] image::ImageError),
    #[error("the crop selection does not overlap the image")]
    EmptyRegion,
}

pub type CropResult<T> = std::result::Result<T, CropError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropPreset {
    #[default]
    Free,
    Ratio1x1,
    Ratio4x3,
    Ratio3x4,
    Ratio16x9,
    Ratio9x16,
}

impl CropPreset {
    pub const ALL: [CropPreset; 6] = [
        Self::Free,
        Self::Ratio1x1,
        Self::Ratio4x3,
        Self::Ratio3x4,
        Self::Ratio16x9,
        Self::Ratio9x16,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Ratio1x1 => "1:1",
            Self::Ratio4x3 => "4:3",
            Self::Ratio3x4 => "3:4",
            Self::Ratio16x9 => "16:9",
            Self::Ratio9x16 => "9:16",
        }
    }

    pub const fn ratio(self) -> Option<(u32, u32)> {
        match self {
            Self::Free => None,
            Self::Ratio1x1 => Some((1, 1)),
            Self::Ratio4x3 => Some((4, 3)),
            Self::Ratio3x4 => Some((3, 4)),
            Self::Ratio16x9 => Some((16, 9)),
            Self::Ratio9x16 => Some((9, 16)),
        }
    }

    pub fn aspect(self) -> Option<f64> {
        self.ratio()
            .map(|(width, height)| f64::from(width) / f64::from(height))
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.label() == label)
    }
}

/// Pending crop selection and target aspect, in displayed coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CropTool {
    selection: Option<DisplayRect>,
    preset: CropPreset,
}

impl CropTool {
    pub fn selection(&self) -> Option<DisplayRect> {
        self.selection
    }

    pub fn preset(&self) -> CropPreset {
        self.preset
    }

    pub fn set_selection(&mut self, selection: Option<DisplayRect>) {
        self.selection = selection;
    }

    /// Switches the aspect preset. Fixed ratios start from a centred selection;
    /// `Free` drops the pending selection.
    pub fn set_preset(&mut self, preset: CropPreset, displayed: DisplaySize) {
        self.preset = preset;
        self.selection = preset
            .aspect()
            .map(|aspect| centered_aspect_selection(displayed, aspect));
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

pub fn centered_aspect_selection(displayed: DisplaySize, aspect: f64) -> DisplayRect {
    let mut width = displayed.width * CENTERED_SELECTION_WIDTH;
    let mut height = width / aspect;
    if height > displayed.height {
        height = displayed.height;
        width = height * aspect;
    }
    DisplayRect::new(
        (displayed.width - width) / 2.0,
        (displayed.height - height) / 2.0,
        width,
        height,
    )
}

/// Rasterizes the native-space region under `selection` into a new artifact.
///
/// The result keeps the source format when it can be encoded and falls back to PNG.
pub fn crop_artifact(
    source: &ImageArtifact,
    selection: DisplayRect,
    scale: ScaleFactors,
) -> CropResult<ImageArtifact> {
    let source_format = source
        .image_format()
        .or_else(|| image::guess_format(source.bytes()).ok());
    let decoded = match source_format {
        Some(format) => image::load_from_memory_with_format(source.bytes(), format),
        None => image::load_from_memory(source.bytes()),
    }
    .map_err(CropError::Decode)?;

    let bounds = ImageBounds::new(decoded.width(), decoded.height());
    let region = selection
        .to_native_within(scale, bounds)
        .ok_or(CropError::EmptyRegion)?;
    tracing::debug!(?selection, ?region, "cropping native region");

    let cropped = decoded.crop_imm(region.x, region.y, region.width, region.height);
    let output_format = source_format
        .filter(ImageFormat::writing_enabled)
        .unwrap_or(ImageFormat::Png);
    let cropped = match output_format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(cropped.to_rgb8()),
        _ => cropped,
    };

    let mut buffer = Cursor::new(Vec::new());
    cropped
        .write_to(&mut buffer, output_format)
        .map_err(CropError::Encode)?;

    Ok(ImageArtifact::generated(
        "cropped",
        output_format.to_mime_type(),
        buffer.into_inner(),
    ))
}

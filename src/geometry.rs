/// Shared coordinate primitives for mapping between the displayed image and its native pixels.

/// A point in displayed (scaled) coordinates, relative to the image element's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayPoint {
    pub x: f64,
    pub y: f64,
}

impl DisplayPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl DisplaySize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBounds {
    pub width: u32,
    pub height: u32,
}

impl ImageBounds {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Native pixel coordinate marking the focus of a localized edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotspot {
    pub x: u32,
    pub y: u32,
}

impl Hotspot {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Display-to-native scale factors (`natural / displayed` per axis).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub x: f64,
    pub y: f64,
}

impl ScaleFactors {
    pub fn between(displayed: DisplaySize, natural: ImageBounds) -> Self {
        Self {
            x: f64::from(natural.width) / displayed.width,
            y: f64::from(natural.height) / displayed.height,
        }
    }

    pub const fn identity() -> Self {
        Self { x: 1.0, y: 1.0 }
    }
}

/// Maps a click on the displayed image to native pixel coordinates.
///
/// The displayed size must be non-zero; callers only invoke this once the image
/// has been laid out. Negative or non-finite products saturate to `0`.
pub fn map_to_native(click: DisplayPoint, displayed: DisplaySize, natural: ImageBounds) -> Hotspot {
    let scale = ScaleFactors::between(displayed, natural);
    Hotspot::new(scale_round(click.x, scale.x), scale_round(click.y, scale.y))
}

fn scale_round(value: f64, factor: f64) -> u32 {
    // `as` saturates: NaN and negatives become 0.
    (value * factor).round() as u32
}

/// A rectangle in displayed coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DisplayRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Applies the same linear mapping as [`map_to_native`] to the corner and extent.
    pub fn to_native(self, scale: ScaleFactors) -> NativeRect {
        NativeRect {
            x: scale_round(self.x, scale.x),
            y: scale_round(self.y, scale.y),
            width: scale_round(self.width, scale.x),
            height: scale_round(self.height, scale.y),
        }
    }

    /// Maps to native space and intersects with the image.
    ///
    /// Parts left of or above the origin are trimmed rather than shifted; `None`
    /// when nothing of the rectangle lies on the image.
    pub fn to_native_within(self, scale: ScaleFactors, bounds: ImageBounds) -> Option<NativeRect> {
        let (left, right) = native_span(self.x, self.width, scale.x, bounds.width)?;
        let (top, bottom) = native_span(self.y, self.height, scale.y, bounds.height)?;
        Some(NativeRect::new(left, top, right - left, bottom - top))
    }
}

fn native_span(start: f64, extent: f64, factor: f64, limit: u32) -> Option<(u32, u32)> {
    let first = (start * factor).round();
    let last = first + (extent * factor).round();
    if !first.is_finite() || !last.is_finite() {
        return None;
    }
    let low = first.max(0.0);
    let high = last.min(f64::from(limit));
    // Both ends lie in 0..=limit here, so the casts are exact.
    (high > low).then(|| (low as u32, high as u32))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl NativeRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersects the rectangle with the image, returning `None` when nothing is left.
    pub fn clamped_to(self, bounds: ImageBounds) -> Option<Self> {
        let right = self.x.saturating_add(self.width).min(bounds.width);
        let bottom = self.y.saturating_add(self.height).min(bounds.height);
        if self.x >= right || self.y >= bottom {
            return None;
        }
        Some(Self::new(self.x, self.y, right - self.x, bottom - self.y))
    }
}

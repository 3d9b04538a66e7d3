//! Immutable image artifacts and the data URL boundary format.

mod data_url;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use image::ImageFormat;
use uuid::Uuid;

pub use data_url::{
    decode_base64, encode_base64, parse_data_url, to_data_url, DataUrlError, DataUrlResult,
    DecodedDataUrl,
};

pub const DEFAULT_MIME: &str = "image/png";

/// An image version. Cloning aliases the same bytes.
#[derive(Debug, Clone)]
pub struct ImageArtifact {
    id: Uuid,
    name: String,
    mime: String,
    data: Arc<[u8]>,
}

impl ImageArtifact {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            mime: mime.into(),
            data: data.into(),
        }
    }

    /// Builds an artifact named `<prefix>-<unix millis>.<ext>`, the extension following the MIME type.
    pub fn generated(prefix: &str, mime: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        let mime = mime.into();
        let name = format!("{prefix}-{}.{}", unix_millis(), extension_for_mime(&mime));
        Self::new(name, mime, data)
    }

    pub fn from_data_url(url: &str, name: impl Into<String>) -> DataUrlResult<Self> {
        let DecodedDataUrl { mime, bytes } = parse_data_url(url)?;
        Ok(Self::new(name, mime, bytes))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn image_format(&self) -> Option<ImageFormat> {
        ImageFormat::from_mime_type(&self.mime)
    }

    pub fn to_data_url(&self) -> String {
        to_data_url(&self.mime, &self.data)
    }

    /// Filename offered when the user downloads this artifact.
    pub fn download_name(&self) -> String {
        format!("edited-{}", self.name)
    }
}

impl PartialEq for ImageArtifact {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ImageArtifact {}

pub fn extension_for_mime(mime: &str) -> &'static str {
    ImageFormat::from_mime_type(mime)
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("png")
}

pub(crate) fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}

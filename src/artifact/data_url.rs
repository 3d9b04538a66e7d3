use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataUrlError {
    #[error("malformed data URL: missing ',' separator")]
    MissingComma,
    #[error("malformed data URL: could not parse MIME type from header {header:?}")]
    MissingMime { header: String },
    #[error("malformed data URL: invalid base64 payload: {message}")]
    InvalidBase64 { message: String },
}

pub type DataUrlResult<T> = std::result::Result<T, DataUrlError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Parses `data:<mime>;base64,<payload>`.
///
/// Splits on the first comma, takes the MIME type from the `:<mime>;` segment of
/// the header and decodes the remainder as standard base64.
pub fn parse_data_url(url: &str) -> DataUrlResult<DecodedDataUrl> {
    let (header, payload) = url.split_once(',').ok_or(DataUrlError::MissingComma)?;
    let mime = mime_from_header(header).ok_or_else(|| DataUrlError::MissingMime {
        header: header.to_string(),
    })?;
    let bytes = decode_base64(payload)?;
    Ok(DecodedDataUrl {
        mime: mime.to_string(),
        bytes,
    })
}

pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_base64(payload: &str) -> DataUrlResult<Vec<u8>> {
    STANDARD
        .decode(payload.trim())
        .map_err(|err| DataUrlError::InvalidBase64 {
            message: err.to_string(),
        })
}

fn mime_from_header(header: &str) -> Option<&str> {
    let (_, after_colon) = header.split_once(':')?;
    let (mime, _) = after_colon.split_once(';')?;
    (!mime.is_empty()).then_some(mime)
}

//! Text/byte conversion for the encoding names callers pass around as plain
//! strings. Blank names mean "use the default"; anything else must be one of
//! the recognised names below or the conversion fails.

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use bytes::Bytes;

use crate::errors::{Error, Result};

/// Name of the encoding used when none (or a blank one) is requested.
pub const DEFAULT_ENCODING: &str = "utf8";

const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Utf16Le,
    Latin1,
    Ascii,
    Base64,
    Base64Url,
    Hex,
}

impl Encoding {
    /// Canonical lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::Utf16Le => "utf16le",
            Self::Latin1 => "latin1",
            Self::Ascii => "ascii",
            Self::Base64 => "base64",
            Self::Base64Url => "base64url",
            Self::Hex => "hex",
        }
    }

    /// Resolve an optional encoding name, falling back to `default` when the
    /// name is absent or blank.
    pub fn resolve(name: Option<&str>, default: Self) -> Result<Self> {
        match normalize_encoding(name) {
            Some(name) => name.parse(),
            None => Ok(default),
        }
    }

    /// Convert text to bytes. For the binary-to-text encodings (`base64`,
    /// `base64url`, `hex`) the text is the encoded form and gets decoded.
    pub fn encode(self, text: &str) -> Result<Bytes> {
        let bytes = match self {
            Self::Utf8 => return Ok(Bytes::copy_from_slice(text.as_bytes())),
            Self::Utf16Le => text
                .encode_utf16()
                .flat_map(|unit| unit.to_le_bytes())
                .collect(),
            // Code points above U+00FF keep their low byte only.
            Self::Latin1 | Self::Ascii => text.chars().map(|ch| (u32::from(ch) & 0xFF) as u8).collect(),
            Self::Base64 | Self::Base64Url => decode_base64(text, self)?,
            Self::Hex => decode_hex(text),
        };
        Ok(Bytes::from(bytes))
    }

    /// Convert bytes back to text. Invalid sequences are replaced rather than
    /// rejected.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Utf16Le => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
            Self::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Self::Ascii => bytes.iter().map(|&b| char::from(b & 0x7F)).collect(),
            Self::Base64 => STANDARD.encode(bytes),
            Self::Base64Url => URL_SAFE_NO_PAD.encode(bytes),
            Self::Hex => bytes.iter().map(|b| format!("{b:02x}")).collect(),
        }
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        let encoding = match name.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Self::Utf8,
            "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Self::Utf16Le,
            "latin1" | "binary" => Self::Latin1,
            "ascii" => Self::Ascii,
            "base64" => Self::Base64,
            "base64url" => Self::Base64Url,
            "hex" => Self::Hex,
            _ => {
                return Err(Error::UnknownEncoding {
                    name: name.to_string(),
                });
            }
        };
        Ok(encoding)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase and trim an encoding name; blank names become `None`.
pub fn normalize_encoding(name: Option<&str>) -> Option<String> {
    let name = name?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_lowercase())
    }
}

/// Encode `text` using the named encoding, or the default one when the name
/// is absent or blank.
pub fn encode_text(text: &str, encoding: Option<&str>) -> Result<Bytes> {
    Encoding::resolve(encoding, Encoding::Utf8)?.encode(text)
}

fn decode_base64(text: &str, encoding: Encoding) -> Result<Vec<u8>> {
    // Both alphabets are accepted, whitespace and padding are ignored.
    let cleaned: String = text
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '=')
        .map(|ch| match ch {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    LENIENT_BASE64
        .decode(cleaned.as_bytes())
        .map_err(|err| Error::InvalidEncodedData {
            encoding: encoding.as_str(),
            reason: err.to_string(),
        })
}

/// Decodes hex digit pairs up to the first invalid pair.
fn decode_hex(text: &str) -> Vec<u8> {
    text.as_bytes()
        .chunks_exact(2)
        .map_while(|pair| {
            let high = char::from(pair[0]).to_digit(16)?;
            let low = char::from(pair[1]).to_digit(16)?;
            u8::try_from(high * 16 + low).ok()
        })
        .collect()
}

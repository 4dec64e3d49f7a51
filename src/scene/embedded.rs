//! Descriptors carried inside the video container.
//!
//! Producers append the descriptor JSON, zlib-compressed then base64-encoded, between
//! `yyeffectmp4json[[` and `]]yyeffectmp4json`. Containers without the markers ship no
//! descriptor and play with the default one.

use std::io::Read as _;

use anyhow::Context as _;
use base64::Engine as _;
use base64::engine::general_purpose;
use flate2::read::ZlibDecoder;

use crate::foundation::error::EvaResult;
use crate::scene::model::DescriptorData;

const OPEN_MARKER: &[u8] = b"yyeffectmp4json[[";
const CLOSE_MARKER: &[u8] = b"]]yyeffectmp4json";

/// JSON text of the descriptor embedded in `container`, if it carries one.
///
/// A payload that is present but does not decode is an error; missing markers are not.
pub fn embedded_descriptor_json(container: &[u8]) -> EvaResult<Option<String>> {
    let Some(open) = find(container, OPEN_MARKER) else {
        return Ok(None);
    };
    let payload = &container[open + OPEN_MARKER.len()..];
    let Some(close) = find(payload, CLOSE_MARKER) else {
        tracing::warn!(offset = open, "embedded descriptor has no closing marker");
        return Ok(None);
    };

    let encoded: Vec<u8> = payload[..close]
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let compressed = general_purpose::STANDARD
        .decode(&encoded)
        .context("embedded descriptor is not valid base64")?;
    let mut json = String::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_string(&mut json)
        .context("embedded descriptor does not inflate to UTF-8 text")?;
    tracing::debug!(bytes = json.len(), "embedded descriptor found");
    Ok(Some(json))
}

/// Embedded descriptor of `container` parsed into [`DescriptorData`].
pub fn descriptor_from_embedded(container: &[u8]) -> EvaResult<Option<DescriptorData>> {
    let Some(json) = embedded_descriptor_json(container)? else {
        return Ok(None);
    };
    let data = serde_json::from_str(&json).context("parse embedded descriptor")?;
    Ok(Some(data))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
#[path = "../../tests/unit/scene/embedded.rs"]
mod tests;

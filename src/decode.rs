//! Ready-made decoders for [`AssetManager`](crate::AssetManager) requests.
//!
//! Any `FnOnce(&[u8]) -> Result<T, E>` works as a decoder; these cover the
//! common payloads.

use serde::de::DeserializeOwned;

/// Decodes a JSON payload into `T`.
pub fn json<T>() -> impl FnOnce(&[u8]) -> Result<T, serde_json::Error>
where
    T: DeserializeOwned,
{
    |bytes: &[u8]| serde_json::from_slice(bytes)
}

/// Decodes a UTF-8 text payload.
pub fn utf8() -> impl FnOnce(&[u8]) -> Result<String, std::str::Utf8Error> {
    |bytes: &[u8]| std::str::from_utf8(bytes).map(str::to_owned)
}

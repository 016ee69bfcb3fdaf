//! The structured value codec.
//!
//! Values travelling through the store are encoded as message-pack maps
//! keyed by field name. Objects exposing their own binary form bypass this
//! module entirely through `Object::encode`/`Object::decode`; the table
//! descriptor always takes the structured path.

use rmp_serde;
use serde::de::DeserializeOwned;
use serde::Serialize;

use error::Result;

/// Encodes a value as a named-field message-pack map.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
	Ok(rmp_serde::to_vec_named(value)?)
}

/// Decodes a value previously produced by `encode`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
	Ok(rmp_serde::from_slice(bytes)?)
}

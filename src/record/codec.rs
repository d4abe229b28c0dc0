//! Recording encodings.
//!
//! Frame layout for the binary form:
//!
//! ```text
//! ┌──────────┬─────────┬────────────┬──────────────────┬───────────┐
//! │ "RCD\0"  │ version │ len: u32le │ MessagePack body │ crc32: le │
//! └──────────┴─────────┴────────────┴──────────────────┴───────────┘
//! ```

use super::Recording;
use crate::error::{RelayError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Write};
use tracing::trace;

const FRAME_MAGIC: &[u8; 4] = b"RCD\0";
const FRAME_VERSION: u8 = 1;
/// Sanity bound on a frame body.
const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Structured encoding for [`Recording::encode`] and [`Recording::decode`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingFormat {
    /// Human-readable `{"items":[...]}` document.
    #[default]
    Json,
    /// MessagePack with named fields, same shape as the JSON form.
    MessagePack,
}

impl<T, E> Recording<T, E>
where
    T: Serialize + DeserializeOwned,
    E: Serialize + DeserializeOwned,
{
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    pub fn encode(&self, format: RecordingFormat) -> Result<Vec<u8>> {
        match format {
            RecordingFormat::Json => Ok(serde_json::to_vec(self)?),
            RecordingFormat::MessagePack => self.to_msgpack(),
        }
    }

    pub fn decode(bytes: &[u8], format: RecordingFormat) -> Result<Self> {
        match format {
            RecordingFormat::Json => Ok(serde_json::from_slice(bytes)?),
            RecordingFormat::MessagePack => Self::from_msgpack(bytes),
        }
    }

    /// Write one checksummed frame.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let body = self.to_msgpack()?;
        let len = u32::try_from(body.len())
            .map_err(|_| RelayError::Serialization("recording too large to frame".into()))?;

        writer.write_all(FRAME_MAGIC)?;
        writer.write_all(&[FRAME_VERSION])?;
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(&body)?;
        writer.write_all(&crc32fast::hash(&body).to_le_bytes())?;
        trace!(bytes = body.len(), "recording frame written");
        Ok(())
    }

    /// Read one frame written by [`write_to`](Self::write_to).
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != FRAME_MAGIC {
            return Err(RelayError::InvalidFormat("bad recording magic".into()));
        }

        let mut version = [0u8; 1];
        reader.read_exact(&mut version)?;
        if version[0] != FRAME_VERSION {
            return Err(RelayError::InvalidFormat(format!(
                "unsupported recording version: {}",
                version[0]
            )));
        }

        let mut len_bytes = [0u8; 4];
        reader.read_exact(&mut len_bytes)?;
        let len = u32::from_le_bytes(len_bytes) as usize;
        if len > MAX_FRAME_LEN {
            return Err(RelayError::InvalidFormat(format!(
                "recording frame of {} bytes exceeds limit",
                len
            )));
        }

        let mut body = vec![0u8; len];
        reader.read_exact(&mut body)?;

        let mut checksum_bytes = [0u8; 4];
        reader.read_exact(&mut checksum_bytes)?;
        let expected = u32::from_le_bytes(checksum_bytes);
        let got = crc32fast::hash(&body);
        if expected != got {
            return Err(RelayError::ChecksumMismatch { expected, got });
        }

        Self::from_msgpack(&body)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from(&mut Cursor::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordedItem;
    use crate::types::Completion;

    fn sample() -> Recording<i32, String> {
        let mut recording = Recording::new();
        recording.receive(1);
        recording.receive(2);
        recording.receive_completion(Completion::Finished);
        recording
    }

    #[test]
    fn test_json_document_shape() {
        let json = sample().to_json().unwrap();
        assert_eq!(
            json,
            r#"{"items":[{"value":1},{"value":2},{"completion":"finished"}]}"#
        );
    }

    #[test]
    fn test_failed_completion_shape() {
        let mut recording = Recording::<i32, String>::new();
        recording.receive_completion(Completion::Failed("out_of_gas".into()));
        assert_eq!(
            recording.to_json().unwrap(),
            r#"{"items":[{"completion":{"failed":"out_of_gas"}}]}"#
        );
    }

    #[test]
    fn test_json_rejects_value_after_completion() {
        let json = r#"{"items":[{"completion":"finished"},{"value":3}]}"#;
        let err = Recording::<i32, String>::from_json(json).unwrap_err();
        assert!(matches!(err, RelayError::Deserialization(_)));
    }

    #[test]
    fn test_msgpack_matches_json_items() {
        let recording = sample();
        let bytes = recording.encode(RecordingFormat::MessagePack).unwrap();
        let decoded = Recording::<i32, String>::decode(&bytes, RecordingFormat::MessagePack).unwrap();
        assert_eq!(decoded.items(), recording.items());
    }

    #[test]
    fn test_frame_detects_corruption() {
        let mut bytes = sample().to_bytes().unwrap();
        let body_start = FRAME_MAGIC.len() + 1 + 4;
        bytes[body_start] ^= 0xFF;

        let err = Recording::<i32, String>::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, RelayError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_frame_rejects_bad_magic() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[0] = b'X';
        let err = Recording::<i32, String>::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, RelayError::InvalidFormat(_)));
    }

    #[test]
    fn test_frame_truncated_is_io_error() {
        let bytes = sample().to_bytes().unwrap();
        let err = Recording::<i32, String>::from_bytes(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(matches!(err, RelayError::Io(_)));
    }

    #[test]
    fn test_frame_round_trip() {
        let recording = sample();
        let decoded = Recording::<i32, String>::from_bytes(&recording.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, recording);
        assert!(matches!(
            decoded.items().last(),
            Some(RecordedItem::Completion(Completion::Finished))
        ));
    }
}

//! On-disk record encoding for spilled runs.

use std::io::{self, Read, Write};

use graphos_common::utils::error::{Error, Result};

/// A record type that knows how to frame itself for a spilled run.
///
/// The trait owns the on-disk shape entirely, including length-prefixing,
/// checksumming, and end-of-stream detection, so a [`SpillFile`](super::SpillFile)
/// never has to know anything about the record's layout beyond "write one,
/// read one". A blanket implementation below covers any
/// `T: Serialize + DeserializeOwned` using `bincode` for the payload; types
/// with a cheaper native format may implement this trait directly instead.
pub trait SpillCodec: Sized {
    /// Writes one record's on-disk frame.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    fn encode(&self, writer: &mut impl Write) -> Result<()>;

    /// Reads one record's on-disk frame, or `None` at a clean end-of-stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is truncated mid-record, fails its
    /// checksum, or fails to deserialize.
    fn decode(reader: &mut impl Read) -> Result<Option<Self>>;
}

impl<T> SpillCodec for T
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    fn encode(&self, writer: &mut impl Write) -> Result<()> {
        let payload = bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| Error::Serialization(e.to_string()))?;
        let len = u32::try_from(payload.len())
            .map_err(|_| Error::internal("record too large to spill"))?;

        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(&payload)?;
        let checksum = crc32fast::hash(&payload);
        writer.write_all(&checksum.to_le_bytes())?;
        Ok(())
    }

    fn decode(reader: &mut impl Read) -> Result<Option<Self>> {
        let mut len_buf = [0u8; 4];
        match reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(err) => return Err(err.into()),
        }
        let len = u32::from_le_bytes(len_buf) as usize;

        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload)?;

        let mut crc_buf = [0u8; 4];
        reader.read_exact(&mut crc_buf)?;
        let expected = u32::from_le_bytes(crc_buf);
        let actual = crc32fast::hash(&payload);
        if actual != expected {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "spill file checksum mismatch",
            )));
        }

        bincode::serde::decode_from_slice(&payload, bincode::config::standard())
            .map(|(value, _)| Some(value))
            .map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_a_byte_buffer() {
        let mut buf = Vec::new();
        42_i64.encode(&mut buf).unwrap();
        7_i64.encode(&mut buf).unwrap();

        let mut cursor = &buf[..];
        assert_eq!(i64::decode(&mut cursor).unwrap(), Some(42));
        assert_eq!(i64::decode(&mut cursor).unwrap(), Some(7));
        assert_eq!(i64::decode(&mut cursor).unwrap(), None);
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let mut buf = Vec::new();
        42_i64.encode(&mut buf).unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0xFF;

        let mut cursor = &buf[..];
        assert!(i64::decode(&mut cursor).is_err());
    }
}

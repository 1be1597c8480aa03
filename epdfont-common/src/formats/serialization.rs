//! Binary serialization trait for fixed-size records.
//!
//! Every record in the `.fontbin` and partition layouts implements
//! `BinarySerializable` so tables of records can be read and written
//! generically. Each type also keeps its own `to_bytes()` returning a
//! fixed-size array for the common case.

use crate::FormatError;

/// Trait for binary-serializable fixed-size records.
///
/// The trait uses `Vec<u8>` for the return type because associated const
/// generics in return types (`[u8; Self::SIZE]`) are not yet stable in Rust.
///
/// # Example
///
/// ```
/// use epdfont_common::formats::{BinarySerializable, IntervalRecord};
///
/// let record = IntervalRecord::new(0x41, 0x5A, 0);
///
/// // Using the trait (returns Vec<u8>)
/// let bytes = record.serialize();
/// let parsed = IntervalRecord::deserialize(&bytes).unwrap();
/// assert_eq!(parsed, record);
///
/// // Using the type-specific method (returns [u8; 12])
/// let bytes_array = record.to_bytes();
/// assert_eq!(bytes_array.len(), 12);
/// ```
pub trait BinarySerializable: Sized {
    /// Size of the serialized record in bytes.
    const SIZE: usize;

    /// Serialize to bytes.
    fn serialize(&self) -> Vec<u8>;

    /// Deserialize from bytes.
    ///
    /// Returns `None` if the byte slice is too short.
    fn deserialize(bytes: &[u8]) -> Option<Self>;
}

/// Read `count` consecutive records starting at `offset`
pub fn read_table<T: BinarySerializable>(
    bytes: &[u8],
    offset: usize,
    count: usize,
    what: &'static str,
) -> Result<Vec<T>, FormatError> {
    let needed = offset + count * T::SIZE;
    if bytes.len() < needed {
        return Err(FormatError::Truncated {
            what,
            needed,
            actual: bytes.len(),
        });
    }
    Ok(bytes[offset..needed]
        .chunks_exact(T::SIZE)
        .filter_map(T::deserialize)
        .collect())
}

/// Append every record of a table
pub(crate) fn write_table<T: BinarySerializable>(out: &mut Vec<u8>, records: &[T]) {
    for record in records {
        out.extend_from_slice(&record.serialize());
    }
}

#[inline]
pub(crate) fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

#[inline]
pub(crate) fn read_i16(bytes: &[u8], at: usize) -> i16 {
    i16::from_le_bytes([bytes[at], bytes[at + 1]])
}

#[inline]
pub(crate) fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[inline]
pub(crate) fn read_i32(bytes: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Implements [`BinarySerializable`] by forwarding to the type's own
/// `to_bytes()` / `from_bytes()` pair.
macro_rules! impl_binary_serializable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl BinarySerializable for $ty {
                const SIZE: usize = <$ty>::SIZE;

                fn serialize(&self) -> Vec<u8> {
                    self.to_bytes().to_vec()
                }

                fn deserialize(bytes: &[u8]) -> Option<Self> {
                    Self::from_bytes(bytes)
                }
            }
        )*
    };
}

impl_binary_serializable!(
    super::FontBinHeader,
    super::GlyphRecord,
    super::IntervalRecord,
    super::PartitionHeader,
    super::GroupDirEntry,
    super::FontDirEntry,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{
        FontBinHeader, FontDirEntry, GlyphRecord, GroupDirEntry, IntervalRecord, PartitionHeader,
    };

    /// Demonstrates generic function using the trait
    fn record_size<T: BinarySerializable>() -> usize {
        T::SIZE
    }

    #[test]
    fn test_record_sizes() {
        assert_eq!(record_size::<PartitionHeader>(), 20);
        assert_eq!(record_size::<GroupDirEntry>(), 24);
        assert_eq!(record_size::<FontDirEntry>(), 68);
        assert_eq!(record_size::<GlyphRecord>(), 16);
        assert_eq!(record_size::<IntervalRecord>(), 12);
        assert_eq!(record_size::<FontBinHeader>(), 72);
    }

    #[test]
    fn test_deserialize_insufficient_bytes() {
        assert!(PartitionHeader::deserialize(&[0; 19]).is_none());
        assert!(GroupDirEntry::deserialize(&[0; 23]).is_none());
        assert!(FontDirEntry::deserialize(&[0; 67]).is_none());
        assert!(GlyphRecord::deserialize(&[0; 15]).is_none());
        assert!(IntervalRecord::deserialize(&[0; 11]).is_none());
        assert!(FontBinHeader::deserialize(&[0; 71]).is_none());
    }

    #[test]
    fn test_read_table() {
        let records = vec![
            IntervalRecord::new(0x20, 0x7E, 0),
            IntervalRecord::new(0xA0, 0xFF, 95),
        ];
        let mut bytes = vec![0xEE; 3];
        write_table(&mut bytes, &records);

        let parsed: Vec<IntervalRecord> = read_table(&bytes, 3, 2, "intervals").unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_read_table_truncated() {
        let err = read_table::<GlyphRecord>(&[0; 40], 0, 3, "glyph table").unwrap_err();
        assert_eq!(
            err,
            FormatError::Truncated {
                what: "glyph table",
                needed: 48,
                actual: 40
            }
        );
    }
}

//! Fixed-width, NUL-padded name fields.

use crate::FormatError;

/// Encode `name` into a NUL-padded field of `N` bytes
///
/// The field always keeps at least one terminating NUL, so the longest
/// accepted name is `N - 1` bytes.
pub fn encode_name<const N: usize>(name: &str) -> Result<[u8; N], FormatError> {
    let bytes = name.as_bytes();
    if bytes.len() >= N {
        return Err(FormatError::NameTooLong {
            name: name.to_string(),
            len: bytes.len(),
            max: N - 1,
        });
    }
    let mut field = [0u8; N];
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(field)
}

/// Decode a NUL-padded name field (stops at the first NUL)
pub fn decode_name(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

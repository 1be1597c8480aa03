//! Binary font layouts
//!
//! POD little-endian layouts consumed by the firmware:
//! - `.fontbin`: one compiled font (header, bitmap, glyph table, interval table)
//! - compressed groups: device-side lookup of a glyph inside an inflated group
//! - partition image: many `.fontbin` fonts clustered by group, each group
//!   aligned to a flash memory-map page
//!
//! All fixed-size records implement the [`BinarySerializable`] trait for
//! consistent serialization/deserialization.

mod fontbin;
mod glyph;
mod group;
mod interval;
mod name;
mod partition;
mod serialization;

pub use fontbin::*;
pub use glyph::*;
pub use group::*;
pub use interval::*;
pub use name::{decode_name, encode_name};
pub use partition::*;
pub use serialization::{read_table, BinarySerializable};

/// Round `value` up to a multiple of `align` (a power of two)
#[inline]
pub const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 4), 0);
        assert_eq!(align_up(1, 4), 4);
        assert_eq!(align_up(72, 4), 72);
        assert_eq!(align_up(75, 4), 76);
        assert_eq!(align_up(1, PARTITION_PAGE_SIZE), 0x10000);
        assert_eq!(align_up(0x10001, PARTITION_PAGE_SIZE), 0x20000);
    }
}

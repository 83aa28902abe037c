//! Endianness-aware conversion between byte spans and fixed-width numbers
//!
//! Callers always pre-check slice lengths, so reading from a slice that is
//! too short is a bug and panics on the slice index.

use std::fmt;

/// A fixed-width number that can be read from and written to target memory
pub trait Numeric: Copy + PartialOrd + PartialEq + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Width in bytes
    const SIZE: usize;

    /// Decodes a value from the first `SIZE` bytes of `bytes`
    fn read(bytes: &[u8], little_endian: bool) -> Self;

    /// Encodes the value into the first `SIZE` bytes of `out`
    fn write(self, out: &mut [u8], little_endian: bool);

    /// Projects the value onto f64 for mixed comparisons
    fn to_f64(self) -> f64;
}

/// Integer numbers, compared in their own width
pub trait Integer: Numeric + Ord {
    /// Reinterprets the low bits of a 64-bit pattern
    fn from_bits(bits: u64) -> Self;

    /// Raw bits zero-extended to 64 bits
    fn to_bits(self) -> u64;
}

macro_rules! impl_numeric {
    ($($t:ty),* $(,)?) => {
        $(
            impl Numeric for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                #[inline]
                fn read(bytes: &[u8], little_endian: bool) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    if little_endian {
                        <$t>::from_le_bytes(raw)
                    } else {
                        <$t>::from_be_bytes(raw)
                    }
                }

                #[inline]
                fn write(self, out: &mut [u8], little_endian: bool) {
                    let raw = if little_endian { self.to_le_bytes() } else { self.to_be_bytes() };
                    out[..Self::SIZE].copy_from_slice(&raw);
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

macro_rules! impl_integer {
    ($($t:ty => $unsigned:ty),* $(,)?) => {
        $(
            impl Integer for $t {
                #[inline]
                fn from_bits(bits: u64) -> Self {
                    bits as $unsigned as $t
                }

                #[inline]
                fn to_bits(self) -> u64 {
                    self as $unsigned as u64
                }
            }
        )*
    };
}

impl_numeric!(u8, i16, u16, i32, u32, i64, u64, f32, f64);
impl_integer!(u8 => u8, i16 => u16, u16 => u16, i32 => u32, u32 => u32, i64 => u64, u64 => u64);

/// Reads a `T` from the front of `bytes`
#[inline]
pub fn read<T: Numeric>(bytes: &[u8], little_endian: bool) -> T {
    T::read(bytes, little_endian)
}

/// Writes `value` to the front of `out`
#[inline]
pub fn write<T: Numeric>(value: T, out: &mut [u8], little_endian: bool) {
    value.write(out, little_endian)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_big_and_little_endian() {
        let bytes = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0];

        assert_eq!(read::<u8>(&bytes, false), 0x12);
        assert_eq!(read::<i16>(&bytes, false), 0x1234);
        assert_eq!(read::<i16>(&bytes, true), 0x3412);
        assert_eq!(read::<i32>(&bytes, false), 0x1234_5678);
        assert_eq!(read::<u32>(&bytes, true), 0x7856_3412);
        assert_eq!(read::<u64>(&bytes, false), 0x1234_5678_9ABC_DEF0);
    }

    #[test]
    fn test_read_floats() {
        assert_eq!(read::<f32>(&[0x3F, 0x80, 0x00, 0x00], false), 1.0);
        assert_eq!(read::<f32>(&[0x00, 0x00, 0x80, 0x3F], true), 1.0);
        assert_eq!(
            read::<f64>(&[0x40, 0x09, 0x21, 0xFB, 0x54, 0x44, 0x2D, 0x18], false),
            std::f64::consts::PI
        );
    }

    #[test]
    fn test_write_is_symmetric_with_read() {
        let mut buf = [0u8; 8];
        write(-2i32, &mut buf, false);
        assert_eq!(&buf[..4], &[0xFF, 0xFF, 0xFF, 0xFE]);
        assert_eq!(read::<i32>(&buf, false), -2);

        write(1.5f64, &mut buf, true);
        assert_eq!(read::<f64>(&buf, true), 1.5);
    }

    #[test]
    fn test_integer_bits() {
        assert_eq!((-1i16).to_bits(), 0xFFFF);
        assert_eq!(i16::from_bits(0xFFFF), -1);
        assert_eq!(u16::from_bits(0xFFFF), u16::MAX);
        assert_eq!(i32::from_bits(0x1_0000_0005), 5);
        assert_eq!(u8::from_bits(0x1FF), 0xFF);
    }

    #[test]
    #[should_panic]
    fn test_short_slice_panics() {
        let _ = read::<i32>(&[0x00, 0x01], false);
    }
}

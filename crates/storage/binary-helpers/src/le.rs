use crate::bin_error::BinaryError;

/// A trait for integer types with a fixed little-endian wire representation.
/// Implemented for the unsigned widths the storage format uses.
pub trait LittleEndianInteger: Sized + Copy {
    /// The size of the type in bytes.
    const SIZE: usize;

    /// Decodes the integer from a slice of exactly `Self::SIZE` bytes.
    fn from_le(source_bytes: &[u8]) -> Result<Self, BinaryError>;

    /// Encodes the integer into a slice of exactly `Self::SIZE` bytes.
    fn to_le(self, target_buffer: &mut [u8]) -> Result<(), BinaryError>;
}

macro_rules! impl_little_endian_integer {
    ($t:ty) => {
        impl LittleEndianInteger for $t {
            const SIZE: usize = std::mem::size_of::<$t>();

            fn from_le(source_bytes: &[u8]) -> Result<Self, BinaryError> {
                let Ok(bytes) = <[u8; Self::SIZE]>::try_from(source_bytes) else {
                    return Err(BinaryError::SliceOutOfRange {
                        expected: Self::SIZE,
                        from_offset: 0,
                    });
                };
                Ok(<$t>::from_le_bytes(bytes))
            }

            fn to_le(self, target_buffer: &mut [u8]) -> Result<(), BinaryError> {
                let encoded = self.to_le_bytes();
                if target_buffer.len() != encoded.len() {
                    return Err(BinaryError::SliceOutOfRange {
                        expected: encoded.len(),
                        from_offset: 0,
                    });
                }
                target_buffer.copy_from_slice(&encoded);
                Ok(())
            }
        }
    };
}

impl_little_endian_integer!(u8);
impl_little_endian_integer!(u16);
impl_little_endian_integer!(u32);
impl_little_endian_integer!(u64);

/// Reads a value of type `T` from `bytes` starting at `start_offset`.
pub fn read_le<T: LittleEndianInteger>(
    bytes: &[u8],
    start_offset: usize,
) -> Result<T, BinaryError> {
    let Some(slice) = bytes.get(start_offset..start_offset + T::SIZE) else {
        return Err(BinaryError::SliceOutOfRange {
            expected: T::SIZE,
            from_offset: start_offset,
        });
    };

    T::from_le(slice)
}

/// Writes `value` into `bytes` starting at `start_offset`.
pub fn write_le<T: LittleEndianInteger>(
    bytes: &mut [u8],
    start_offset: usize,
    value: T,
) -> Result<(), BinaryError> {
    let Some(slice) = bytes.get_mut(start_offset..start_offset + T::SIZE) else {
        return Err(BinaryError::SliceOutOfRange {
            expected: T::SIZE,
            from_offset: start_offset,
        });
    };

    value.to_le(slice)
}

#[cfg(test)]
mod le_tests {
    use super::*;

    #[test]
    fn read_le_u64_at_offset() {
        let mut bytes = [0u8; 12];
        bytes[4] = 0x2A;
        assert_eq!(read_le::<u64>(&bytes, 4).unwrap(), 42);
    }

    #[test]
    fn read_le_past_end_is_an_error() {
        let bytes = [0u8; 4];
        assert!(matches!(
            read_le::<u64>(&bytes, 0),
            Err(BinaryError::SliceOutOfRange {
                expected: 8,
                from_offset: 0
            })
        ));
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut bytes = [0u8; 16];
        write_le::<u32>(&mut bytes, 3, 0xDEAD_BEEF).unwrap();
        assert_eq!(read_le::<u32>(&bytes, 3).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn write_le_u8_single_byte() {
        let mut bytes = [0u8; 2];
        write_le::<u8>(&mut bytes, 1, 5).unwrap();
        assert_eq!(bytes, [0, 5]);
    }
}

use crate::{
    byte_reader::ByteReader,
    byte_writer::ByteWrite,
    error::SerdeErr,
    serde::{ConstByteLength, Serde},
};

// Numbers are written big-endian, fixed width

macro_rules! impl_serde_for_number {
    ($($number:ty),*) => {$(
        impl Serde for $number {
            fn ser(&self, writer: &mut dyn ByteWrite) {
                writer.write_bytes(&self.to_be_bytes());
            }

            fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
                const LENGTH: usize = std::mem::size_of::<$number>();
                let bytes = reader.read_bytes(LENGTH)?;
                let mut array = [0_u8; LENGTH];
                array.copy_from_slice(bytes);
                Ok(<$number>::from_be_bytes(array))
            }

            fn byte_length(&self) -> u32 {
                <Self as ConstByteLength>::const_byte_length()
            }
        }

        impl ConstByteLength for $number {
            fn const_byte_length() -> u32 {
                std::mem::size_of::<$number>() as u32
            }
        }
    )*};
}

impl_serde_for_number!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

// Bool

impl Serde for bool {
    fn ser(&self, writer: &mut dyn ByteWrite) {
        writer.write_byte(u8::from(*self));
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        match reader.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(SerdeErr),
        }
    }

    fn byte_length(&self) -> u32 {
        1
    }
}

impl ConstByteLength for bool {
    fn const_byte_length() -> u32 {
        1
    }
}

// String, length-prefixed with a u32

impl Serde for String {
    fn ser(&self, writer: &mut dyn ByteWrite) {
        (self.len() as u32).ser(writer);
        writer.write_bytes(self.as_bytes());
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let length = u32::de(reader)? as usize;
        let bytes = reader.read_bytes(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SerdeErr)
    }

    fn byte_length(&self) -> u32 {
        4 + self.len() as u32
    }
}

// Option, with a presence byte

impl<T: Serde> Serde for Option<T> {
    fn ser(&self, writer: &mut dyn ByteWrite) {
        match self {
            Some(value) => {
                true.ser(writer);
                value.ser(writer);
            }
            None => false.ser(writer),
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        if bool::de(reader)? {
            Ok(Some(T::de(reader)?))
        } else {
            Ok(None)
        }
    }

    fn byte_length(&self) -> u32 {
        1 + self.as_ref().map_or(0, T::byte_length)
    }
}

// Vec, length-prefixed with a u32

impl<T: Serde> Serde for Vec<T> {
    fn ser(&self, writer: &mut dyn ByteWrite) {
        (self.len() as u32).ser(writer);
        for item in self {
            item.ser(writer);
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let length = u32::de(reader)? as usize;
        // every element takes at least one byte, refuse counts the buffer cannot hold
        if length > reader.bytes_remaining() {
            return Err(SerdeErr);
        }
        let mut output = Vec::with_capacity(length);
        for _ in 0..length {
            output.push(T::de(reader)?);
        }
        Ok(output)
    }

    fn byte_length(&self) -> u32 {
        4 + self.iter().map(T::byte_length).sum::<u32>()
    }
}

// Pairs

impl<A: Serde, B: Serde> Serde for (A, B) {
    fn ser(&self, writer: &mut dyn ByteWrite) {
        self.0.ser(writer);
        self.1.ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok((A::de(reader)?, B::de(reader)?))
    }

    fn byte_length(&self) -> u32 {
        self.0.byte_length() + self.1.byte_length()
    }
}

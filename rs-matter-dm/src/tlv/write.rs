/*
 *
 *    Copyright (c) 2020-2022 Project CHIP Authors
 *
 *    Licensed under the Apache License, Version 2.0 (the "License");
 *    you may not use this file except in compliance with the License.
 *    You may obtain a copy of the License at
 *
 *        http://www.apache.org/licenses/LICENSE-2.0
 *
 *    Unless required by applicable law or agreed to in writing, software
 *    distributed under the License is distributed on an "AS IS" BASIS,
 *    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *    See the License for the specific language governing permissions and
 *    limitations under the License.
 */

use crate::error::{Error, ErrorCode};
use crate::utils::storage::WriteBuf;

use super::{TLVControl, TLVTag, TLVTagType, TLVValueType};

/// A sink where data can be serialized as a TLV stream by synchronously
/// appending bytes to it.
///
/// The only methods that need to be implemented are `write` and `get_tail`.
/// The trait is append-only: once written, a byte is never revisited, so it can
/// be implemented by anything that can output a byte somewhere (an in-memory
/// buffer, or the `usize` byte counter used for sizing an encoding upfront).
pub trait TLVWrite {
    /// Write a tag and a TLV S8 value.
    fn i8(&mut self, tag: &TLVTag, data: i8) -> Result<(), Error> {
        self.raw_value(tag, TLVValueType::S8, &data.to_le_bytes())
    }

    /// Write a tag and a TLV U8 value.
    fn u8(&mut self, tag: &TLVTag, data: u8) -> Result<(), Error> {
        self.raw_value(tag, TLVValueType::U8, &data.to_le_bytes())
    }

    /// Write a tag and a TLV S16 or (if the data is small enough) S8 value.
    fn i16(&mut self, tag: &TLVTag, data: i16) -> Result<(), Error> {
        if let Ok(data) = i8::try_from(data) {
            self.i8(tag, data)
        } else {
            self.raw_value(tag, TLVValueType::S16, &data.to_le_bytes())
        }
    }

    /// Write a tag and a TLV U16 or (if the data is small enough) U8 value.
    fn u16(&mut self, tag: &TLVTag, data: u16) -> Result<(), Error> {
        if let Ok(data) = u8::try_from(data) {
            self.u8(tag, data)
        } else {
            self.raw_value(tag, TLVValueType::U16, &data.to_le_bytes())
        }
    }

    /// Write a tag and the smallest TLV signed integer holding `data`.
    fn i32(&mut self, tag: &TLVTag, data: i32) -> Result<(), Error> {
        if let Ok(data) = i16::try_from(data) {
            self.i16(tag, data)
        } else {
            self.raw_value(tag, TLVValueType::S32, &data.to_le_bytes())
        }
    }

    /// Write a tag and the smallest TLV unsigned integer holding `data`.
    fn u32(&mut self, tag: &TLVTag, data: u32) -> Result<(), Error> {
        if let Ok(data) = u16::try_from(data) {
            self.u16(tag, data)
        } else {
            self.raw_value(tag, TLVValueType::U32, &data.to_le_bytes())
        }
    }

    /// Write a tag and the smallest TLV signed integer holding `data`.
    fn i64(&mut self, tag: &TLVTag, data: i64) -> Result<(), Error> {
        if let Ok(data) = i32::try_from(data) {
            self.i32(tag, data)
        } else {
            self.raw_value(tag, TLVValueType::S64, &data.to_le_bytes())
        }
    }

    /// Write a tag and the smallest TLV unsigned integer holding `data`.
    fn u64(&mut self, tag: &TLVTag, data: u64) -> Result<(), Error> {
        if let Ok(data) = u32::try_from(data) {
            self.u32(tag, data)
        } else {
            self.raw_value(tag, TLVValueType::U64, &data.to_le_bytes())
        }
    }

    fn f32(&mut self, tag: &TLVTag, data: f32) -> Result<(), Error> {
        self.raw_value(tag, TLVValueType::F32, &data.to_le_bytes())
    }

    fn f64(&mut self, tag: &TLVTag, data: f64) -> Result<(), Error> {
        self.raw_value(tag, TLVValueType::F64, &data.to_le_bytes())
    }

    /// Write a tag and a TLV Octet String.
    ///
    /// The smallest length field (Str8l, Str16l, Str32l or Str64l) holding the
    /// data length is chosen.
    fn str(&mut self, tag: &TLVTag, data: &[u8]) -> Result<(), Error> {
        self.len_prefixed(tag, TLVValueType::Str8l, data)
    }

    /// Write a tag and a TLV UTF-8 String.
    ///
    /// The smallest length field (Utf8l, Utf16l, Utf32l or Utf64l) holding the
    /// data length is chosen.
    fn utf8(&mut self, tag: &TLVTag, data: &str) -> Result<(), Error> {
        self.len_prefixed(tag, TLVValueType::Utf8l, data.as_bytes())
    }

    /// Write a tag and the start of a Struct container.
    ///
    /// NOTE: `end_container` must be called after writing all the fields,
    /// or else the generated TLV stream will be invalid.
    fn start_struct(&mut self, tag: &TLVTag) -> Result<(), Error> {
        self.raw_value(tag, TLVValueType::Struct, &[])
    }

    /// Write a tag and the start of an Array container.
    fn start_array(&mut self, tag: &TLVTag) -> Result<(), Error> {
        self.raw_value(tag, TLVValueType::Array, &[])
    }

    /// Write a tag and the start of a List container.
    fn start_list(&mut self, tag: &TLVTag) -> Result<(), Error> {
        self.raw_value(tag, TLVValueType::List, &[])
    }

    /// Write a tag and the start of a container of type `container_type`.
    fn start_container(&mut self, tag: &TLVTag, container_type: TLVValueType) -> Result<(), Error> {
        if !container_type.is_container_start() {
            Err(ErrorCode::TLVTypeMismatch)?;
        }

        self.raw_value(tag, container_type, &[])
    }

    /// Write the end of the innermost open Struct, Array or List container.
    fn end_container(&mut self) -> Result<(), Error> {
        self.write(TLVControl::new(TLVTagType::Anonymous, TLVValueType::EndCnt).as_raw())
    }

    fn null(&mut self, tag: &TLVTag) -> Result<(), Error> {
        self.raw_value(tag, TLVValueType::Null, &[])
    }

    fn bool(&mut self, tag: &TLVTag, val: bool) -> Result<(), Error> {
        let value_type = if val {
            TLVValueType::True
        } else {
            TLVValueType::False
        };

        self.raw_value(tag, value_type, &[])
    }

    /// Write a control byte, a tag and an already-encoded value payload.
    fn raw_value(
        &mut self,
        tag: &TLVTag,
        value_type: TLVValueType,
        value_payload: &[u8],
    ) -> Result<(), Error> {
        self.write(TLVControl::new(tag.tag_type(), value_type).as_raw())?;

        match tag {
            TLVTag::Anonymous => Ok(()),
            TLVTag::Context(v) => self.write(*v),
            TLVTag::CommonPrf16(v) | TLVTag::ImplPrf16(v) => self.write_raw_data(&v.to_le_bytes()),
            TLVTag::CommonPrf32(v) | TLVTag::ImplPrf32(v) => self.write_raw_data(&v.to_le_bytes()),
            TLVTag::FullQual48 {
                vendor_id,
                profile,
                tag,
            } => {
                self.write_raw_data(&vendor_id.to_le_bytes())?;
                self.write_raw_data(&profile.to_le_bytes())?;
                self.write_raw_data(&tag.to_le_bytes())
            }
            TLVTag::FullQual64 {
                vendor_id,
                profile,
                tag,
            } => {
                self.write_raw_data(&vendor_id.to_le_bytes())?;
                self.write_raw_data(&profile.to_le_bytes())?;
                self.write_raw_data(&tag.to_le_bytes())
            }
        }?;

        self.write_raw_data(value_payload)
    }

    #[doc(hidden)]
    fn len_prefixed(&mut self, tag: &TLVTag, base: TLVValueType, data: &[u8]) -> Result<(), Error> {
        // `base` is the 1-octet length variant; the wider variants follow it
        let len = data.len();

        if let Ok(len) = u8::try_from(len) {
            self.raw_value(tag, base, &len.to_le_bytes())?;
        } else if let Ok(len) = u16::try_from(len) {
            self.raw_value(tag, wider(base, 1)?, &len.to_le_bytes())?;
        } else if let Ok(len) = u32::try_from(len) {
            self.raw_value(tag, wider(base, 2)?, &len.to_le_bytes())?;
        } else {
            self.raw_value(tag, wider(base, 3)?, &(len as u64).to_le_bytes())?;
        }

        self.write_raw_data(data)
    }

    fn write_raw_data(&mut self, bytes: &[u8]) -> Result<(), Error> {
        for byte in bytes {
            self.write(*byte)?;
        }

        Ok(())
    }

    fn write(&mut self, byte: u8) -> Result<(), Error>;

    /// The number of bytes written so far.
    fn get_tail(&self) -> usize;
}

fn wider(base: TLVValueType, by: u8) -> Result<TLVValueType, Error> {
    num::FromPrimitive::from_u8(base as u8 + by).ok_or_else(|| ErrorCode::TLVTypeMismatch.into())
}

impl<T> TLVWrite for &mut T
where
    T: TLVWrite,
{
    fn write(&mut self, byte: u8) -> Result<(), Error> {
        (**self).write(byte)
    }

    fn get_tail(&self) -> usize {
        (**self).get_tail()
    }
}

impl TLVWrite for WriteBuf<'_> {
    fn write(&mut self, byte: u8) -> Result<(), Error> {
        WriteBuf::le_u8(self, byte)
    }

    fn write_raw_data(&mut self, bytes: &[u8]) -> Result<(), Error> {
        WriteBuf::append(self, bytes)
    }

    fn get_tail(&self) -> usize {
        WriteBuf::get_tail(self)
    }
}

/// A `TLVWrite` implementation that only counts the number of bytes written.
impl TLVWrite for usize {
    fn write(&mut self, _byte: u8) -> Result<(), Error> {
        *self += 1;

        Ok(())
    }

    fn write_raw_data(&mut self, bytes: &[u8]) -> Result<(), Error> {
        *self += bytes.len();

        Ok(())
    }

    fn get_tail(&self) -> usize {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::{TLVTag, TLVWrite};
    use crate::error::ErrorCode;
    use crate::utils::storage::WriteBuf;

    #[test]
    fn test_write_success() {
        let mut buf = [0; 20];
        let mut tw = WriteBuf::new(&mut buf);

        tw.start_struct(&TLVTag::Anonymous).unwrap();
        tw.u8(&TLVTag::Anonymous, 12).unwrap();
        tw.u8(&TLVTag::Context(1), 13).unwrap();
        tw.u16(&TLVTag::Anonymous, 0x1212).unwrap();
        tw.u16(&TLVTag::Context(2), 0x1313).unwrap();
        tw.start_array(&TLVTag::Context(3)).unwrap();
        tw.bool(&TLVTag::Anonymous, true).unwrap();
        tw.end_container().unwrap();
        tw.end_container().unwrap();
        assert_eq!(
            buf,
            [21, 4, 12, 36, 1, 13, 5, 0x12, 0x012, 37, 2, 0x13, 0x13, 54, 3, 9, 24, 24, 0, 0]
        );
    }

    #[test]
    fn test_write_overflow() {
        let mut buf = [0; 6];
        let mut tw = WriteBuf::new(&mut buf);

        tw.u8(&TLVTag::Anonymous, 12).unwrap();
        tw.u8(&TLVTag::Context(1), 13).unwrap();
        assert_eq!(
            tw.u16(&TLVTag::Context(2), 0x1313).unwrap_err().code(),
            ErrorCode::NoSpace
        );
    }

    #[test]
    fn test_smallest_width() {
        let mut buf = [0; 32];
        let mut tw = WriteBuf::new(&mut buf);

        tw.u64(&TLVTag::Context(0), 0x2a).unwrap();
        assert_eq!(tw.as_slice(), &[0x24, 0x00, 0x2a]);

        tw.reset();
        tw.u64(&TLVTag::Context(0), 0x1_0000_0000).unwrap();
        assert_eq!(
            tw.as_slice(),
            &[0x27, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]
        );

        tw.reset();
        tw.i64(&TLVTag::Anonymous, -170000).unwrap();
        assert_eq!(tw.as_slice(), &[0x02, 0xf0, 0x67, 0xfd, 0xff]);
    }

    #[test]
    fn test_long_octet_string() {
        let data = [0xaa; 300];

        let mut len = 0_usize;
        len.str(&TLVTag::Context(1), &data).unwrap();
        // Control, tag, 2-octet length, payload
        assert_eq!(len, 1 + 1 + 2 + 300);

        let mut buf = [0; 310];
        let mut tw = WriteBuf::new(&mut buf);
        tw.str(&TLVTag::Context(1), &data).unwrap();
        assert_eq!(&tw.as_slice()[..4], &[0x31, 0x01, 0x2c, 0x01]);
    }

    #[test]
    fn test_matter_spec_examples() {
        let mut buf = [0; 200];
        let mut tw = WriteBuf::new(&mut buf);

        tw.bool(&TLVTag::Anonymous, false).unwrap();
        assert_eq!(&[0x08], tw.as_slice());

        tw.reset();
        tw.i8(&TLVTag::Anonymous, 42).unwrap();
        assert_eq!(&[0x00, 0x2a], tw.as_slice());

        tw.reset();
        tw.i32(&TLVTag::Anonymous, -17).unwrap();
        assert_eq!(&[0x00, 0xef], tw.as_slice());

        tw.reset();
        tw.i16(&TLVTag::Anonymous, 422).unwrap();
        assert_eq!(&[0x01, 0xa6, 0x01], tw.as_slice());

        tw.reset();
        tw.utf8(&TLVTag::Anonymous, "Tschüs").unwrap();
        assert_eq!(
            &[0x0c, 0x07, 0x54, 0x73, 0x63, 0x68, 0xc3, 0xbc, 0x73],
            tw.as_slice()
        );

        tw.reset();
        tw.null(&TLVTag::Anonymous).unwrap();
        assert_eq!(&[0x14], tw.as_slice());

        tw.reset();
        tw.f32(&TLVTag::Anonymous, 17.9).unwrap();
        assert_eq!(&[0x0a, 0x33, 0x33, 0x8f, 0x41], tw.as_slice());

        tw.reset();
        tw.start_struct(&TLVTag::Anonymous).unwrap();
        tw.i8(&TLVTag::Context(0), 42).unwrap();
        tw.i8(&TLVTag::Context(1), -17).unwrap();
        tw.end_container().unwrap();
        assert_eq!(
            &[0x15, 0x20, 0x00, 0x2a, 0x20, 0x01, 0xef, 0x18],
            tw.as_slice()
        );

        tw.reset();
        tw.start_list(&TLVTag::Anonymous).unwrap();
        tw.end_container().unwrap();
        assert_eq!(&[0x17, 0x18], tw.as_slice());

        tw.reset();
        tw.u8(
            &TLVTag::FullQual48 {
                vendor_id: 0xFFF1,
                profile: 0xDEED,
                tag: 1,
            },
            42,
        )
        .unwrap();
        assert_eq!(
            &[0xc4, 0xf1, 0xff, 0xed, 0xde, 0x01, 0x00, 0x2a],
            tw.as_slice()
        );
    }
}

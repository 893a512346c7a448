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

//! The marshaller of list attributes kept in flat attribute buffers.
//!
//! A list attribute buffer starts with a 2-byte little-endian entry count,
//! followed by the entries, each `stride` bytes long:
//!
//! ```text
//! | count (LE u16) | entry 1 | entry 2 | ... |
//! ```
//!
//! A count of `0xFFFF` marks the list as invalid, with undefined content.
//!
//! Inside an entry, every sub-field lives at a fixed offset. Integers are
//! always little-endian regardless of the host. Octet strings occupy a
//! fixed-size slot holding a 2-byte little-endian length and the payload.

use byteorder::{ByteOrder, LittleEndian};
use log::error;

use crate::dm::{AttrId, ClusterId};
use crate::error::{Error, ErrorCode};
use crate::utils::storage::WriteBuf;

use super::clusters::noc;

/// The length of the entry count header.
pub const LIST_COUNT_LEN: usize = 2;

/// The entry count marking a list as invalid.
pub const INVALID_LIST_COUNT: u16 = 0xFFFF;

/// The maximum number of sub-fields of a list entry.
pub const MAX_LIST_SUB_FIELDS: usize = 8;

/// The width of a list entry sub-field.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldWidth {
    U8,
    U16,
    U32,
    U64,
    /// A length-prefixed octet string in a slot of `slot` bytes, the length
    /// prefix included.
    Octets { slot: u16 },
}

impl FieldWidth {
    /// The number of bytes the sub-field occupies in the entry.
    pub const fn len(&self) -> u16 {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
            Self::U64 => 8,
            Self::Octets { slot } => *slot,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ListSubField {
    pub name: &'static str,
    /// The offset of the sub-field relative to the start of its entry.
    pub offset: u16,
    pub width: FieldWidth,
}

impl ListSubField {
    pub const fn new(name: &'static str, offset: u16, width: FieldWidth) -> Self {
        Self {
            name,
            offset,
            width,
        }
    }

    const fn end(&self) -> u16 {
        self.offset + self.width.len()
    }
}

/// The entry layout of one list attribute.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ListAttributeLayout {
    pub cluster: ClusterId,
    pub attr: AttrId,
    pub stride: u16,
    pub fields: &'static [ListSubField],
}

impl ListAttributeLayout {
    /// Return `true` if the sub-fields are in offset order, do not overlap,
    /// fit in the stride, and every octet slot can hold its length prefix.
    pub const fn is_consistent(&self) -> bool {
        if self.fields.len() > MAX_LIST_SUB_FIELDS {
            return false;
        }

        let mut end = 0;
        let mut i = 0;

        while i < self.fields.len() {
            let field = &self.fields[i];

            if field.offset < end {
                return false;
            }

            if let FieldWidth::Octets { slot } = field.width {
                if slot < LIST_COUNT_LEN as u16 {
                    return false;
                }
            }

            end = field.end();
            i += 1;
        }

        end <= self.stride
    }
}

/// The declared metadata of an attribute buffer.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttrMeta {
    pub id: AttrId,
    /// The total size of the attribute buffer, count header included.
    pub size: u16,
}

/// The native value of one sub-field.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldValue<'a> {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Octets(&'a [u8]),
}

impl FieldValue<'_> {
    fn fits(&self, width: FieldWidth) -> bool {
        matches!(
            (self, width),
            (Self::U8(_), FieldWidth::U8)
                | (Self::U16(_), FieldWidth::U16)
                | (Self::U32(_), FieldWidth::U32)
                | (Self::U64(_), FieldWidth::U64)
                | (Self::Octets(_), FieldWidth::Octets { .. })
        )
    }
}

/// The native form of a list entry: its sub-field values in layout order.
pub type ListEntry<'a> = heapless::Vec<FieldValue<'a>, MAX_LIST_SUB_FIELDS>;

/// The native side of a copy from the wire buffer.
#[derive(Debug)]
pub enum NativeMut<'n, 'w> {
    /// The whole attribute buffer, copied as-is.
    Raw(&'n mut [u8]),
    /// The entry count.
    Count(&'n mut u16),
    /// One entry. Octet strings borrow the wire buffer.
    Entry(&'n mut ListEntry<'w>),
}

/// The native side of a copy to the wire buffer.
#[derive(Debug, Clone, Copy)]
pub enum NativeRef<'n> {
    Raw(&'n [u8]),
    Count(u16),
    Entry(&'n [FieldValue<'n>]),
}

/// The direction and the two sides of a `ListAttributeMarshaller::copy_list` call.
#[derive(Debug)]
pub enum ListCopy<'n, 'w> {
    /// Decode from the wire buffer into the native side.
    Read {
        wire: &'w [u8],
        native: NativeMut<'n, 'w>,
    },
    /// Encode the native side into the wire buffer.
    Write {
        native: NativeRef<'n>,
        wire: &'w mut [u8],
    },
}

impl ListCopy<'_, '_> {
    fn wire_len(&self) -> usize {
        match self {
            Self::Read { wire, .. } => wire.len(),
            Self::Write { wire, .. } => wire.len(),
        }
    }
}

/// The marshaller of the list attributes described by a static set of layouts.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct ListAttributeMarshaller {
    layouts: &'static [ListAttributeLayout],
}

impl ListAttributeMarshaller {
    /// The list attributes of the device: the fabrics list only.
    pub const DEFAULT: Self = Self::new(&[noc::FABRICS_LAYOUT]);

    pub const fn new(layouts: &'static [ListAttributeLayout]) -> Self {
        Self { layouts }
    }

    pub fn layout(&self, cluster: ClusterId, attr: AttrId) -> Option<&'static ListAttributeLayout> {
        self.layouts
            .iter()
            .find(|layout| layout.cluster == cluster && layout.attr == attr)
    }

    /// The entry stride of the attribute, or 0 if it is not a list attribute.
    pub fn entry_stride(&self, cluster: ClusterId, attr: AttrId) -> u16 {
        self.layout(cluster, attr).map_or(0, |layout| layout.stride)
    }

    /// The size the list in `buffer` occupies, count header included.
    ///
    /// An invalid list sizes to 0 whatever its stride.
    pub fn list_size(&self, cluster: ClusterId, attr: AttrId, buffer: &[u8]) -> Result<u16, Error> {
        let count = read_count(buffer)?;

        if count == INVALID_LIST_COUNT {
            return Ok(0);
        }

        let total =
            LIST_COUNT_LEN as u32 + count as u32 * self.entry_stride(cluster, attr) as u32;

        u16::try_from(total).map_err(|_| {
            error!(
                "Cluster {:#010x}: Size of attribute {:#010x} is too large.",
                cluster, attr
            );
            ErrorCode::NoSpace.into()
        })
    }

    /// Copy a list attribute, or a part of it, between the wire buffer and its native form.
    ///
    /// - `index == -1` copies the whole `meta.size` bytes of the buffer as-is;
    /// - `index == 0` copies the entry count;
    /// - `index` in `1..=0xFFFE` copies the entry at offset `2 + (index - 1) * stride`,
    ///   sub-field by sub-field.
    ///
    /// Returns the number of bytes the copied part occupies on the wire, which
    /// is 0 when copying an entry of an attribute that is not a list.
    pub fn copy_list(
        &self,
        cluster: ClusterId,
        meta: &AttrMeta,
        copy: ListCopy<'_, '_>,
        index: i32,
    ) -> Result<u16, Error> {
        match index {
            -1 => copy_raw(meta, copy),
            0 => copy_count(copy),
            1..=0xFFFE => {
                let Some(layout) = self.layout(cluster, meta.id) else {
                    return Ok(0);
                };

                let stride = layout.stride as usize;
                let offset = LIST_COUNT_LEN + (index as usize - 1) * stride;

                if offset + stride > meta.size as usize || offset + stride > copy.wire_len() {
                    error!("Index {} is invalid.", index);
                    Err(ErrorCode::BufferTooSmall)?;
                }

                match copy {
                    ListCopy::Read {
                        wire,
                        native: NativeMut::Entry(entry),
                    } => read_entry(layout, &wire[offset..offset + stride], entry)?,
                    ListCopy::Write {
                        native: NativeRef::Entry(entry),
                        wire,
                    } => write_entry(layout, entry, &mut wire[offset..offset + stride])?,
                    _ => Err(ErrorCode::InvalidArgument)?,
                }

                Ok(layout.stride)
            }
            _ => {
                error!("Index {} is invalid. Should be between 1 and 65534", index);
                Err(ErrorCode::InvalidArgument.into())
            }
        }
    }
}

fn read_count(buffer: &[u8]) -> Result<u16, Error> {
    buffer
        .get(..LIST_COUNT_LEN)
        .map(LittleEndian::read_u16)
        .ok_or_else(|| ErrorCode::BufferTooSmall.into())
}

fn copy_raw(meta: &AttrMeta, copy: ListCopy<'_, '_>) -> Result<u16, Error> {
    let size = meta.size as usize;

    let (dst, src) = match copy {
        ListCopy::Read {
            wire,
            native: NativeMut::Raw(native),
        } => (native.get_mut(..size), wire.get(..size)),
        ListCopy::Write {
            native: NativeRef::Raw(native),
            wire,
        } => (wire.get_mut(..size), native.get(..size)),
        _ => Err(ErrorCode::InvalidArgument)?,
    };

    let (Some(dst), Some(src)) = (dst, src) else {
        return Err(ErrorCode::BufferTooSmall.into());
    };

    dst.copy_from_slice(src);

    Ok(meta.size)
}

fn copy_count(copy: ListCopy<'_, '_>) -> Result<u16, Error> {
    match copy {
        ListCopy::Read {
            wire,
            native: NativeMut::Count(count),
        } => *count = read_count(wire)?,
        ListCopy::Write {
            native: NativeRef::Count(count),
            wire,
        } => WriteBuf::new(wire).le_u16(count)?,
        _ => Err(ErrorCode::InvalidArgument)?,
    }

    Ok(LIST_COUNT_LEN as _)
}

fn sub_field<'a>(entry: &'a [u8], field: &ListSubField) -> Result<&'a [u8], Error> {
    entry
        .get(field.offset as usize..field.end() as usize)
        .ok_or_else(|| ErrorCode::BufferTooSmall.into())
}

fn read_entry<'w>(
    layout: &ListAttributeLayout,
    entry: &'w [u8],
    native: &mut ListEntry<'w>,
) -> Result<(), Error> {
    native.clear();

    for field in layout.fields {
        let data = sub_field(entry, field)?;

        let value = match field.width {
            FieldWidth::U8 => FieldValue::U8(data[0]),
            FieldWidth::U16 => FieldValue::U16(LittleEndian::read_u16(data)),
            FieldWidth::U32 => FieldValue::U32(LittleEndian::read_u32(data)),
            FieldWidth::U64 => FieldValue::U64(LittleEndian::read_u64(data)),
            FieldWidth::Octets { .. } => {
                let Some((len, payload)) = data.split_first_chunk::<LIST_COUNT_LEN>() else {
                    return Err(ErrorCode::InvalidData.into());
                };
                let len = u16::from_le_bytes(*len) as usize;

                let Some(payload) = payload.get(..len) else {
                    error!(
                        "{}: length {} does not fit its slot of {} bytes",
                        field.name,
                        len,
                        data.len()
                    );
                    return Err(ErrorCode::InvalidData.into());
                };

                FieldValue::Octets(payload)
            }
        };

        native.push(value).map_err(|_| ErrorCode::NoSpace)?;
    }

    Ok(())
}

fn write_entry(
    layout: &ListAttributeLayout,
    native: &[FieldValue<'_>],
    entry: &mut [u8],
) -> Result<(), Error> {
    if native.len() != layout.fields.len() {
        Err(ErrorCode::InvalidArgument)?;
    }

    // Check everything first, so that a failure leaves the entry untouched
    for (field, value) in layout.fields.iter().zip(native) {
        if !value.fits(field.width) {
            error!("{}: value {:?} does not match {:?}", field.name, value, field.width);
            Err(ErrorCode::InvalidArgument)?;
        }

        if let (FieldValue::Octets(payload), FieldWidth::Octets { slot }) = (value, field.width) {
            if payload.len() + LIST_COUNT_LEN > slot as usize {
                error!(
                    "{}: {} bytes do not fit in a slot of {} bytes. Not enough remaining space",
                    field.name,
                    payload.len(),
                    slot
                );
                Err(ErrorCode::NoSpace)?;
            }
        }

        sub_field(entry, field)?;
    }

    for (field, value) in layout.fields.iter().zip(native) {
        let data = &mut entry[field.offset as usize..field.end() as usize];
        let mut wb = WriteBuf::new(data);

        match value {
            FieldValue::U8(value) => wb.le_u8(*value)?,
            FieldValue::U16(value) => wb.le_u16(*value)?,
            FieldValue::U32(value) => wb.le_u32(*value)?,
            FieldValue::U64(value) => wb.le_u64(*value)?,
            FieldValue::Octets(payload) => {
                wb.le_u16(payload.len() as _)?;
                wb.append(payload)?;

                // Unused slot space is zeroed
                let used = wb.get_tail();
                data[used..].fill(0);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POINT: ListAttributeLayout = ListAttributeLayout {
        cluster: 0xFFF1_FC00,
        attr: 0x0000,
        stride: 12,
        fields: &[
            ListSubField::new("Id", 0, FieldWidth::U8),
            ListSubField::new("X", 1, FieldWidth::U16),
            ListSubField::new("Y", 3, FieldWidth::U32),
            ListSubField::new("Tag", 7, FieldWidth::Octets { slot: 5 }),
        ],
    };

    const MARSHALLER: ListAttributeMarshaller = ListAttributeMarshaller::new(&[POINT]);

    const _: () = assert!(POINT.is_consistent());

    const META: AttrMeta = AttrMeta {
        id: 0x0000,
        size: 2 + 2 * 12,
    };

    fn write(buf: &mut [u8], index: i32, entry: &[FieldValue]) -> Result<u16, Error> {
        MARSHALLER.copy_list(
            POINT.cluster,
            &META,
            ListCopy::Write {
                native: NativeRef::Entry(entry),
                wire: buf,
            },
            index,
        )
    }

    fn read<'w>(buf: &'w [u8], index: i32, entry: &mut ListEntry<'w>) -> Result<u16, Error> {
        MARSHALLER.copy_list(
            POINT.cluster,
            &META,
            ListCopy::Read {
                wire: buf,
                native: NativeMut::Entry(entry),
            },
            index,
        )
    }

    #[test]
    fn test_entry_bytes() {
        let mut buf = [0xee; 26];

        let entry = [
            FieldValue::U8(7),
            FieldValue::U16(0x1234),
            FieldValue::U32(0xcafebabe),
            FieldValue::Octets(b"ab"),
        ];
        assert_eq!(write(&mut buf, 2, &entry).unwrap(), 12);

        // Entry 1 and the header are untouched
        assert_eq!(&buf[..14], &[0xee; 14]);
        assert_eq!(
            &buf[14..],
            &[7, 0x34, 0x12, 0xbe, 0xba, 0xfe, 0xca, 2, 0, b'a', b'b', 0]
        );

        let mut native = ListEntry::new();
        assert_eq!(read(&buf, 2, &mut native).unwrap(), 12);
        assert_eq!(native.as_slice(), &entry);
    }

    #[test]
    fn test_count() {
        let mut buf = [0; 26];

        let len = MARSHALLER
            .copy_list(
                POINT.cluster,
                &META,
                ListCopy::Write {
                    native: NativeRef::Count(0x0102),
                    wire: &mut buf,
                },
                0,
            )
            .unwrap();
        assert_eq!(len, 2);
        assert_eq!(&buf[..2], &[0x02, 0x01]);

        let mut count = 0;
        MARSHALLER
            .copy_list(
                POINT.cluster,
                &META,
                ListCopy::Read {
                    wire: &buf,
                    native: NativeMut::Count(&mut count),
                },
                0,
            )
            .unwrap();
        assert_eq!(count, 0x0102);
    }

    #[test]
    fn test_bounds() {
        let mut buf = [0; 26];
        let entry = [
            FieldValue::U8(1),
            FieldValue::U16(2),
            FieldValue::U32(3),
            FieldValue::Octets(&[]),
        ];

        // Sized for exactly 2 entries
        assert_eq!(
            write(&mut buf, 3, &entry).unwrap_err().code(),
            ErrorCode::BufferTooSmall
        );
        let mut native = ListEntry::new();
        assert_eq!(
            read(&buf, 3, &mut native).unwrap_err().code(),
            ErrorCode::BufferTooSmall
        );

        // A wire buffer shorter than declared
        let mut short = [0; 20];
        assert_eq!(
            write(&mut short, 2, &entry).unwrap_err().code(),
            ErrorCode::BufferTooSmall
        );

        for index in [-2, 0xFFFF, i32::MAX, i32::MIN] {
            assert_eq!(
                read(&buf, index, &mut native).unwrap_err().code(),
                ErrorCode::InvalidArgument
            );
        }
    }

    #[test]
    fn test_octets_slot() {
        let mut buf = [0; 26];

        let entry = [
            FieldValue::U8(1),
            FieldValue::U16(2),
            FieldValue::U32(3),
            FieldValue::Octets(b"abcd"),
        ];
        assert_eq!(
            write(&mut buf, 1, &entry).unwrap_err().code(),
            ErrorCode::NoSpace
        );
        assert_eq!(buf, [0; 26]);

        // A length prefix claiming more than the slot holds
        buf[2 + 7] = 4;
        let mut native = ListEntry::new();
        assert_eq!(
            read(&buf, 1, &mut native).unwrap_err().code(),
            ErrorCode::InvalidData
        );
    }

    #[test]
    fn test_entry_mismatch() {
        let mut buf = [0; 26];

        // Too few values
        assert_eq!(
            write(&mut buf, 1, &[FieldValue::U8(1)]).unwrap_err().code(),
            ErrorCode::InvalidArgument
        );

        // Wrong width
        let entry = [
            FieldValue::U8(1),
            FieldValue::U32(2),
            FieldValue::U32(3),
            FieldValue::Octets(&[]),
        ];
        assert_eq!(
            write(&mut buf, 1, &entry).unwrap_err().code(),
            ErrorCode::InvalidArgument
        );

        // Native side of the wrong kind
        let mut count = 0;
        assert_eq!(
            MARSHALLER
                .copy_list(
                    POINT.cluster,
                    &META,
                    ListCopy::Read {
                        wire: &buf,
                        native: NativeMut::Count(&mut count),
                    },
                    1,
                )
                .unwrap_err()
                .code(),
            ErrorCode::InvalidArgument
        );
    }

    #[test]
    fn test_unknown_attribute() {
        let buf = [0; 26];
        let mut native = ListEntry::new();

        assert_eq!(MARSHALLER.entry_stride(POINT.cluster, 1), 0);
        assert_eq!(
            MARSHALLER
                .copy_list(
                    POINT.cluster,
                    &AttrMeta { id: 1, size: 26 },
                    ListCopy::Read {
                        wire: &buf,
                        native: NativeMut::Entry(&mut native),
                    },
                    1,
                )
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_raw() {
        let src = [0x5a; 26];
        let mut wire = [0; 30];

        let len = MARSHALLER
            .copy_list(
                POINT.cluster,
                &META,
                ListCopy::Write {
                    native: NativeRef::Raw(&src),
                    wire: &mut wire,
                },
                -1,
            )
            .unwrap();
        assert_eq!(len, 26);
        assert_eq!(&wire[..26], &src);
        assert_eq!(&wire[26..], &[0; 4]);

        let mut native = [0; 10];
        assert_eq!(
            MARSHALLER
                .copy_list(
                    POINT.cluster,
                    &META,
                    ListCopy::Read {
                        wire: &wire,
                        native: NativeMut::Raw(&mut native),
                    },
                    -1,
                )
                .unwrap_err()
                .code(),
            ErrorCode::BufferTooSmall
        );
    }

    #[test]
    fn test_list_size() {
        assert_eq!(
            MARSHALLER.list_size(POINT.cluster, 0, &[3, 0]).unwrap(),
            2 + 3 * 12
        );
        assert_eq!(MARSHALLER.list_size(POINT.cluster, 0, &[0xff, 0xff]).unwrap(), 0);
        // Not a list: header only
        assert_eq!(MARSHALLER.list_size(POINT.cluster, 9, &[3, 0]).unwrap(), 2);
        assert_eq!(
            MARSHALLER
                .list_size(POINT.cluster, 0, &[0xfe, 0xff])
                .unwrap_err()
                .code(),
            ErrorCode::NoSpace
        );
        assert_eq!(
            MARSHALLER.list_size(POINT.cluster, 0, &[3]).unwrap_err().code(),
            ErrorCode::BufferTooSmall
        );
    }

    #[test]
    fn test_layout_consistency() {
        const OVERLAP: ListAttributeLayout = ListAttributeLayout {
            cluster: 0,
            attr: 0,
            stride: 4,
            fields: &[
                ListSubField::new("A", 0, FieldWidth::U16),
                ListSubField::new("B", 1, FieldWidth::U16),
            ],
        };

        const OVERFLOW: ListAttributeLayout = ListAttributeLayout {
            cluster: 0,
            attr: 0,
            stride: 4,
            fields: &[ListSubField::new("A", 0, FieldWidth::U64)],
        };

        assert!(!OVERLAP.is_consistent());
        assert!(!OVERFLOW.is_consistent());
        assert!(noc::FABRICS_LAYOUT.is_consistent());
    }
}

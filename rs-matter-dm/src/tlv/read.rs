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

use core::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, ErrorCode};

use super::{TLVControl, TLVTag, TLVTagType, TLVValue, TLVValueType};

/// A single TLV element, borrowed from the byte slice it was encoded in.
///
/// Nothing is decoded upfront: the tag, the value and (for containers) the
/// inner elements are parsed on demand by the accessor methods, which return
/// `ErrorCode::TLVTypeMismatch` on malformed or truncated data.
///
/// An *empty* element (one wrapping `&[]`) is what lookups like
/// [`TLVSequence::find_ctx`] return for data which is not present. It is not a
/// valid element, and all accessors other than `is_empty` fail on it.
#[derive(Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TLVElement<'a>(TLVSequence<'a>);

impl<'a> TLVElement<'a> {
    /// Create a new `TLVElement` from a byte slice containing an encoded TLV element.
    #[inline(always)]
    pub const fn new(data: &'a [u8]) -> Self {
        Self(TLVSequence(data))
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.0 .0.is_empty()
    }

    #[inline(always)]
    pub const fn raw_data(&self) -> &'a [u8] {
        self.0 .0
    }

    #[inline(always)]
    pub fn control(&self) -> Result<TLVControl, Error> {
        self.0.control()
    }

    /// Return the exact raw slice of the encoded value of this element.
    ///
    /// For containers, this walks the whole container and so also validates
    /// that the container is properly closed.
    #[inline(always)]
    pub fn raw_value(&self) -> Result<&'a [u8], Error> {
        let control = self.control()?;

        self.0.container_value(control)
    }

    pub fn tag(&self) -> Result<TLVTag, Error> {
        let tag_type = self.control()?.tag_type;
        let slice = self.0.tag(tag_type)?;

        let tag = match tag_type {
            TLVTagType::Anonymous => TLVTag::Anonymous,
            TLVTagType::Context => TLVTag::Context(slice[0]),
            TLVTagType::CommonPrf16 => TLVTag::CommonPrf16(LittleEndian::read_u16(slice)),
            TLVTagType::CommonPrf32 => TLVTag::CommonPrf32(LittleEndian::read_u32(slice)),
            TLVTagType::ImplPrf16 => TLVTag::ImplPrf16(LittleEndian::read_u16(slice)),
            TLVTagType::ImplPrf32 => TLVTag::ImplPrf32(LittleEndian::read_u32(slice)),
            TLVTagType::FullQual48 => TLVTag::FullQual48 {
                vendor_id: LittleEndian::read_u16(&slice[0..]),
                profile: LittleEndian::read_u16(&slice[2..]),
                tag: LittleEndian::read_u16(&slice[4..]),
            },
            TLVTagType::FullQual64 => TLVTag::FullQual64 {
                vendor_id: LittleEndian::read_u16(&slice[0..]),
                profile: LittleEndian::read_u16(&slice[2..]),
                tag: LittleEndian::read_u32(&slice[4..]),
            },
        };

        Ok(tag)
    }

    /// Return the value of this element.
    ///
    /// For containers, only the container type is returned, not its content.
    pub fn value(&self) -> Result<TLVValue<'a>, Error> {
        let control = self.control()?;
        let slice = self.0.value(control)?;

        let value = match control.value_type {
            TLVValueType::S8 => TLVValue::S8(slice[0] as i8),
            TLVValueType::S16 => TLVValue::S16(LittleEndian::read_i16(slice)),
            TLVValueType::S32 => TLVValue::S32(LittleEndian::read_i32(slice)),
            TLVValueType::S64 => TLVValue::S64(LittleEndian::read_i64(slice)),
            TLVValueType::U8 => TLVValue::U8(slice[0]),
            TLVValueType::U16 => TLVValue::U16(LittleEndian::read_u16(slice)),
            TLVValueType::U32 => TLVValue::U32(LittleEndian::read_u32(slice)),
            TLVValueType::U64 => TLVValue::U64(LittleEndian::read_u64(slice)),
            TLVValueType::False => TLVValue::False,
            TLVValueType::True => TLVValue::True,
            TLVValueType::F32 => TLVValue::F32(LittleEndian::read_f32(slice)),
            TLVValueType::F64 => TLVValue::F64(LittleEndian::read_f64(slice)),
            t if t.is_utf8() => TLVValue::Utf8(
                t,
                core::str::from_utf8(slice).map_err(|_| ErrorCode::TLVTypeMismatch)?,
            ),
            t if t.is_str() => TLVValue::Str(t, slice),
            TLVValueType::Null => TLVValue::Null,
            TLVValueType::Struct => TLVValue::Struct,
            TLVValueType::Array => TLVValue::Array,
            TLVValueType::List => TLVValue::List,
            _ => TLVValue::EndCnt,
        };

        Ok(value)
    }

    /// Return the value as a `u8`.
    ///
    /// Returns `ErrorCode::TLVTypeMismatch` if the element is not a TLV U8.
    pub fn u8(&self) -> Result<u8, Error> {
        self.fixed(TLVValueType::U8).map(|slice| slice[0])
    }

    /// Return the value as a `u16`, accepting TLV U8 and U16 encodings.
    pub fn u16(&self) -> Result<u16, Error> {
        match self.fixed(TLVValueType::U16) {
            Ok(slice) => Ok(LittleEndian::read_u16(slice)),
            Err(_) => self.u8().map(Into::into),
        }
    }

    /// Return the value as a `u32`, accepting TLV U8, U16 and U32 encodings.
    pub fn u32(&self) -> Result<u32, Error> {
        match self.fixed(TLVValueType::U32) {
            Ok(slice) => Ok(LittleEndian::read_u32(slice)),
            Err(_) => self.u16().map(Into::into),
        }
    }

    /// Return the value as a `u64`, accepting any TLV unsigned integer encoding.
    pub fn u64(&self) -> Result<u64, Error> {
        match self.fixed(TLVValueType::U64) {
            Ok(slice) => Ok(LittleEndian::read_u64(slice)),
            Err(_) => self.u32().map(Into::into),
        }
    }

    pub fn i8(&self) -> Result<i8, Error> {
        self.fixed(TLVValueType::S8).map(|slice| slice[0] as i8)
    }

    pub fn i16(&self) -> Result<i16, Error> {
        match self.fixed(TLVValueType::S16) {
            Ok(slice) => Ok(LittleEndian::read_i16(slice)),
            Err(_) => self.i8().map(Into::into),
        }
    }

    pub fn i32(&self) -> Result<i32, Error> {
        match self.fixed(TLVValueType::S32) {
            Ok(slice) => Ok(LittleEndian::read_i32(slice)),
            Err(_) => self.i16().map(Into::into),
        }
    }

    pub fn i64(&self) -> Result<i64, Error> {
        match self.fixed(TLVValueType::S64) {
            Ok(slice) => Ok(LittleEndian::read_i64(slice)),
            Err(_) => self.i32().map(Into::into),
        }
    }

    pub fn bool(&self) -> Result<bool, Error> {
        match self.control()?.value_type {
            TLVValueType::False => Ok(false),
            TLVValueType::True => Ok(true),
            _ => Err(ErrorCode::TLVTypeMismatch.into()),
        }
    }

    /// Return the value of an octet string element.
    pub fn str(&self) -> Result<&'a [u8], Error> {
        let control = self.control()?;

        if !control.value_type.is_str() {
            Err(ErrorCode::TLVTypeMismatch)?;
        }

        self.0.value(control)
    }

    /// Return the value of a UTF-8 string element.
    pub fn utf8(&self) -> Result<&'a str, Error> {
        let control = self.control()?;

        if !control.value_type.is_utf8() {
            Err(ErrorCode::TLVTypeMismatch)?;
        }

        core::str::from_utf8(self.0.value(control)?).map_err(|_| ErrorCode::InvalidData.into())
    }

    pub fn null(&self) -> Result<(), Error> {
        if matches!(self.control()?.value_type, TLVValueType::Null) {
            Ok(())
        } else {
            Err(ErrorCode::TLVTypeMismatch.into())
        }
    }

    pub fn is_null(&self) -> Result<bool, Error> {
        Ok(matches!(self.control()?.value_type, TLVValueType::Null))
    }

    /// Return the content of the struct container represented by this element.
    pub fn structure(&self) -> Result<TLVSequence<'a>, Error> {
        self.enter(TLVValueType::Struct)
    }

    pub fn array(&self) -> Result<TLVSequence<'a>, Error> {
        self.enter(TLVValueType::Array)
    }

    pub fn list(&self) -> Result<TLVSequence<'a>, Error> {
        self.enter(TLVValueType::List)
    }

    /// Return the content of the container (struct, array or list) represented by this element.
    pub fn container(&self) -> Result<TLVSequence<'a>, Error> {
        if self.control()?.value_type.is_container_start() {
            self.0.next_enter()
        } else {
            Err(ErrorCode::TLVTypeMismatch.into())
        }
    }

    pub fn confirm_anon(&self) -> Result<(), Error> {
        if matches!(self.control()?.tag_type, TLVTagType::Anonymous) {
            Ok(())
        } else {
            Err(ErrorCode::TLVTypeMismatch.into())
        }
    }

    /// Retrieve the context tag of the element, failing for any other tag type.
    pub fn ctx(&self) -> Result<u8, Error> {
        Ok(self.try_ctx()?.ok_or(ErrorCode::TLVTypeMismatch)?)
    }

    /// Retrieve the context tag of the element, or `None` for any other tag type.
    pub fn try_ctx(&self) -> Result<Option<u8>, Error> {
        let control = self.control()?;

        if matches!(control.tag_type, TLVTagType::Context) {
            Ok(Some(self.0.tag(control.tag_type)?[0]))
        } else {
            Ok(None)
        }
    }

    fn fixed(&self, value_type: TLVValueType) -> Result<&'a [u8], Error> {
        let control = self.control()?;

        if control.value_type == value_type {
            self.0.value(control)
        } else {
            Err(ErrorCode::TLVTypeMismatch.into())
        }
    }

    fn enter(&self, value_type: TLVValueType) -> Result<TLVSequence<'a>, Error> {
        if self.control()?.value_type == value_type {
            self.0.next_enter()
        } else {
            Err(ErrorCode::TLVTypeMismatch.into())
        }
    }

    fn fmt(&self, indent: usize, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:indent$}", "", indent = indent)?;

        let tag = self.tag().map_err(|_| fmt::Error)?;
        if !matches!(tag, TLVTag::Anonymous) {
            write!(f, "{}: ", tag)?;
        }

        let value = self.value().map_err(|_| fmt::Error)?;
        write!(f, "{}", value)?;

        if value.value_type().is_container_start() {
            let content = self.container().map_err(|_| fmt::Error)?;
            writeln!(f)?;
            content.fmt(indent + 2, f)?;
            write!(f, "{:indent$}", "", indent = indent)?;

            match value.value_type() {
                TLVValueType::Struct => write!(f, "}}")?,
                TLVValueType::Array => write!(f, "]")?,
                _ => write!(f, ")")?,
            }
        }

        Ok(())
    }
}

impl fmt::Debug for TLVElement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt(0, f)
    }
}

impl fmt::Display for TLVElement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt(0, f)
    }
}

/// A sequence of zero or more TLV elements, e.g. the content of a container.
///
/// The sequence ends either with the end of the slice or with the end marker of
/// the enclosing container, whichever comes first.
#[derive(Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TLVSequence<'a>(pub(crate) &'a [u8]);

impl<'a> TLVSequence<'a> {
    const EMPTY: Self = Self(&[]);

    #[inline(always)]
    pub fn iter(&self) -> TLVSequenceIter<'a> {
        TLVSequenceIter {
            seq: self.clone(),
            failed: false,
        }
    }

    /// Return the first element tagged with context tag `ctx`, or
    /// `ErrorCode::NotFound` if there is none.
    pub fn ctx(&self, ctx: u8) -> Result<TLVElement<'a>, Error> {
        let element = self.find_ctx(ctx)?;

        if element.is_empty() {
            Err(ErrorCode::NotFound.into())
        } else {
            Ok(element)
        }
    }

    /// Return the first element tagged with context tag `ctx`, or an empty
    /// element if there is none.
    pub fn find_ctx(&self, ctx: u8) -> Result<TLVElement<'a>, Error> {
        for elem in self.iter() {
            let elem = elem?;

            if elem.try_ctx()? == Some(ctx) {
                return Ok(elem);
            }
        }

        Ok(TLVElement(Self::EMPTY))
    }

    /// Return the sequence after the first element, entering it if it is a container.
    ///
    /// The returned sequence might start with the `EndCnt` marker of a container.
    fn next_enter(&self) -> Result<Self, Error> {
        if self.0.is_empty() {
            return Ok(Self::EMPTY);
        }

        let control = self.control()?;
        let value_len = self.value_len(control)?;

        Ok(Self(
            self.value_start(control)?
                .get(value_len..)
                .ok_or(ErrorCode::TLVTypeMismatch)?,
        ))
    }

    /// Return the sequence after the first element, skipping over it entirely
    /// if it is a container.
    fn container_next(&self) -> Result<Self, Error> {
        if self.0.is_empty() {
            return Ok(Self::EMPTY);
        }

        let control = self.control()?;

        if control.value_type.is_container_end() {
            control.confirm_container_end()?;

            return Ok(self.clone());
        }

        let mut next = self.next_enter()?;

        if control.value_type.is_container_start() {
            let mut level = 1;

            while level > 0 {
                let control = next.control()?;

                if control.value_type.is_container_end() {
                    control.confirm_container_end()?;
                    level -= 1;
                } else if control.value_type.is_container_start() {
                    level += 1;
                }

                next = next.next_enter()?;
            }
        }

        Ok(next)
    }

    /// Return the first element, or an empty element if the sequence is
    /// exhausted or positioned at a container end.
    fn current(&self) -> Result<TLVElement<'a>, Error> {
        if self.0.is_empty() {
            return Ok(TLVElement(Self::EMPTY));
        }

        let control = self.control()?;

        if control.value_type.is_container_end() {
            control.confirm_container_end()?;

            return Ok(TLVElement(Self::EMPTY));
        }

        Ok(TLVElement(self.clone()))
    }

    #[inline(always)]
    fn control(&self) -> Result<TLVControl, Error> {
        TLVControl::parse(*self.0.first().ok_or(ErrorCode::TLVTypeMismatch)?)
    }

    #[inline(always)]
    fn tag(&self, tag_type: TLVTagType) -> Result<&'a [u8], Error> {
        Ok(self
            .0
            .get(1..1 + tag_type.size())
            .ok_or(ErrorCode::TLVTypeMismatch)?)
    }

    #[inline(always)]
    fn value_len_start(&self, tag_type: TLVTagType) -> Result<&'a [u8], Error> {
        Ok(self
            .0
            .get(1 + tag_type.size()..)
            .ok_or(ErrorCode::TLVTypeMismatch)?)
    }

    #[inline(always)]
    fn value_start(&self, control: TLVControl) -> Result<&'a [u8], Error> {
        Ok(self
            .value_len_start(control.tag_type)?
            .get(control.value_type.variable_size_len()..)
            .ok_or(ErrorCode::TLVTypeMismatch)?)
    }

    /// The raw value payload of the first element (empty for containers).
    #[inline(always)]
    fn value(&self, control: TLVControl) -> Result<&'a [u8], Error> {
        let value_len = self.value_len(control)?;

        Ok(self
            .value_start(control)?
            .get(..value_len)
            .ok_or(ErrorCode::TLVTypeMismatch)?)
    }

    /// The raw value payload of the first element, including the whole
    /// content and the end marker for containers.
    fn container_value(&self, control: TLVControl) -> Result<&'a [u8], Error> {
        let value_len = self.container_value_len(control)?;

        Ok(self
            .value_start(control)?
            .get(..value_len)
            .ok_or(ErrorCode::TLVTypeMismatch)?)
    }

    fn value_len(&self, control: TLVControl) -> Result<usize, Error> {
        if let Some(fixed_size) = control.value_type.fixed_size() {
            return Ok(fixed_size);
        }

        let size_len = control.value_type.variable_size_len();

        let len_slice = self
            .value_len_start(control.tag_type)?
            .get(..size_len)
            .ok_or(ErrorCode::TLVTypeMismatch)?;

        let len = LittleEndian::read_uint(len_slice, size_len);

        usize::try_from(len).map_err(|_| ErrorCode::TLVTypeMismatch.into())
    }

    fn container_value_len(&self, control: TLVControl) -> Result<usize, Error> {
        if !control.value_type.is_container_start() {
            return self.value_len(control);
        }

        let mut next = self.clone();
        let mut len = 0;
        let mut level = 1;

        while level > 0 {
            next = next.next_enter()?;
            len += next.len()?;

            let control = next.control()?;

            if control.value_type.is_container_end() {
                control.confirm_container_end()?;
                level -= 1;
            } else if control.value_type.is_container_start() {
                level += 1;
            }
        }

        Ok(len)
    }

    /// The encoded length of the first element, excluding container content.
    fn len(&self) -> Result<usize, Error> {
        let control = self.control()?;

        self.value_len(control).map(|value_len| {
            1 + control.tag_type.size() + control.value_type.variable_size_len() + value_len
        })
    }

    fn fmt(&self, indent: usize, f: &mut fmt::Formatter) -> fmt::Result {
        for elem in self.iter() {
            elem.map_err(|_| fmt::Error)?.fmt(indent, f)?;
            writeln!(f)?;
        }

        Ok(())
    }
}

impl fmt::Debug for TLVSequence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt(0, f)
    }
}

/// An iterator over the elements of a `TLVSequence`.
///
/// After the first error the iterator is fused and yields `None`.
#[derive(Clone, Debug)]
pub struct TLVSequenceIter<'a> {
    seq: TLVSequence<'a>,
    failed: bool,
}

impl<'a> TLVSequenceIter<'a> {
    fn try_next(&mut self) -> Result<Option<TLVElement<'a>>, Error> {
        let current = self.seq.current()?;

        if current.is_empty() {
            return Ok(None);
        }

        self.seq = self.seq.container_next()?;

        Ok(Some(current))
    }
}

impl<'a> Iterator for TLVSequenceIter<'a> {
    type Item = Result<TLVElement<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let next = self.try_next();
        self.failed = next.is_err();

        next.transpose()
    }
}

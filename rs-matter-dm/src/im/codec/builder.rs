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

use log::warn;

use crate::error::{Error, ErrorCode};
use crate::tlv::{TLVTag, TLVValueType, TLVWrite};

use super::{field_bit, Cardinality, FieldKind, StructSchema, TaggedField};

/// A single-pass, append-only writer of a TLV structure described by a `StructSchema`.
///
/// Setters return `&mut Self` so that fields can be chained. The first error
/// (a tag the schema does not declare, a value of the wrong kind, a full
/// buffer) is sticky: nothing is written after it, and it is reported by
/// `end`.
///
/// Nested structures and repeated fields are written through child builders
/// which mutably borrow their parent, so the parent cannot be written to
/// until the child is ended or dropped. With the `schema-check` feature a
/// child dropped without `end` poisons its parent with `ErrorCode::InvalidState`.
pub struct StructBuilder<'a, W>
where
    W: TLVWrite,
{
    schema: &'static StructSchema,
    tw: &'a mut W,
    error: Option<ErrorCode>,
    parent: Option<&'a mut Option<ErrorCode>>,
    written: u32,
    ended: bool,
}

impl<'a, W> StructBuilder<'a, W>
where
    W: TLVWrite,
{
    /// Start writing a structure of schema `schema` with tag `tag`.
    pub fn new(schema: &'static StructSchema, tw: &'a mut W, tag: &TLVTag) -> Self {
        Self::child(schema, tw, tag, None, None)
    }

    fn child(
        schema: &'static StructSchema,
        tw: &'a mut W,
        tag: &TLVTag,
        parent: Option<&'a mut Option<ErrorCode>>,
        error: Option<ErrorCode>,
    ) -> Self {
        let mut this = Self {
            schema,
            tw,
            error,
            parent,
            written: 0,
            ended: false,
        };

        let container = schema
            .container
            .container_type()
            .unwrap_or(TLVValueType::Struct);
        this.record(|tw| tw.start_container(tag, container));

        this
    }

    pub fn schema(&self) -> &'static StructSchema {
        self.schema
    }

    pub fn u8(&mut self, tag: u8, value: u8) -> &mut Self {
        self.scalar(tag, FieldKind::UInt, |tw, tag| tw.u8(tag, value))
    }

    pub fn u16(&mut self, tag: u8, value: u16) -> &mut Self {
        self.scalar(tag, FieldKind::UInt, |tw, tag| tw.u16(tag, value))
    }

    pub fn u32(&mut self, tag: u8, value: u32) -> &mut Self {
        self.scalar(tag, FieldKind::UInt, |tw, tag| tw.u32(tag, value))
    }

    pub fn u64(&mut self, tag: u8, value: u64) -> &mut Self {
        self.scalar(tag, FieldKind::UInt, |tw, tag| tw.u64(tag, value))
    }

    pub fn i64(&mut self, tag: u8, value: i64) -> &mut Self {
        self.scalar(tag, FieldKind::Int, |tw, tag| tw.i64(tag, value))
    }

    pub fn bool(&mut self, tag: u8, value: bool) -> &mut Self {
        self.scalar(tag, FieldKind::Bool, |tw, tag| tw.bool(tag, value))
    }

    pub fn utf8(&mut self, tag: u8, value: &str) -> &mut Self {
        self.scalar(tag, FieldKind::Utf8, |tw, tag| tw.utf8(tag, value))
    }

    pub fn octets(&mut self, tag: u8, value: &[u8]) -> &mut Self {
        self.scalar(tag, FieldKind::Octets, |tw, tag| tw.str(tag, value))
    }

    /// Write a `null` for a nullable field.
    pub fn null(&mut self, tag: u8) -> &mut Self {
        self.scalar(tag, FieldKind::Null, |tw, tag| tw.null(tag))
    }

    /// Start a nested structure field.
    pub fn create_struct(&mut self, tag: u8) -> StructBuilder<'_, W> {
        let schema = match self.check(tag, |field| {
            matches!(field.cardinality, Cardinality::Scalar)
                .then_some(field.nested)
                .flatten()
        }) {
            Ok(schema) => schema,
            Err(err) => {
                self.fail(err);
                &StructSchema::EMPTY
            }
        };

        let error = self.error;

        StructBuilder::child(
            schema,
            &mut *self.tw,
            &TLVTag::Context(tag),
            Some(&mut self.error),
            error,
        )
    }

    /// Start a repeated field (an array or a list).
    pub fn create_list(&mut self, tag: u8) -> ListBuilder<'_, W> {
        let field = match self.check(tag, |field| {
            matches!(field.cardinality, Cardinality::List).then_some(field)
        }) {
            Ok(field) => field,
            Err(err) => {
                self.fail(err);
                &INVALID_LIST
            }
        };

        let error = self.error;

        ListBuilder::child(
            field,
            &mut *self.tw,
            &TLVTag::Context(tag),
            Some(&mut self.error),
            error,
        )
    }

    /// Alias of `create_list` for fields declared as arrays.
    pub fn create_array(&mut self, tag: u8) -> ListBuilder<'_, W> {
        self.create_list(tag)
    }

    /// Write the end of the structure.
    ///
    /// Returns the first error recorded while building it (or any of its
    /// children), if any.
    pub fn end(mut self) -> Result<(), Error> {
        self.ended = true;

        #[cfg(feature = "schema-check")]
        if self.error.is_none() {
            if let Some(field) = self.missing_mandatory() {
                warn!("{}: mandatory field {} not written", self.schema.name, field.name);
                self.error = Some(ErrorCode::TLVNotFound);
            }
        }

        self.record(|tw| tw.end_container());

        let error = self.error;

        if let Some(parent) = self.parent.take() {
            if parent.is_none() {
                *parent = error;
            }
        }

        error.map_or(Ok(()), |code| Err(code.into()))
    }

    #[cfg(feature = "schema-check")]
    fn missing_mandatory(&self) -> Option<&'static TaggedField> {
        self.schema
            .fields
            .iter()
            .enumerate()
            .find(|(position, field)| {
                field.is_mandatory() && self.written & field_bit(*position) == 0
            })
            .map(|(_, field)| field)
    }

    fn scalar<F>(&mut self, tag: u8, kind: FieldKind, f: F) -> &mut Self
    where
        F: FnOnce(&mut W, &TLVTag) -> Result<(), Error>,
    {
        if self.error.is_none() {
            let checked = self.check(tag, |field| {
                let ok = match kind {
                    FieldKind::Null => field.nullable || field.kind == FieldKind::Null,
                    kind => {
                        matches!(field.cardinality, Cardinality::Scalar)
                            && (field.kind == kind || field.kind == FieldKind::Any)
                    }
                };

                ok.then_some(())
            });

            match checked {
                Ok(()) => self.record(|tw| f(tw, &TLVTag::Context(tag))),
                Err(err) => self.fail(err),
            }
        }

        self
    }

    /// Look up `tag` in the schema, mark it as written and map it with `f`,
    /// which returns `None` if the field cannot be written the requested way.
    fn check<F, R>(&mut self, tag: u8, f: F) -> Result<R, Error>
    where
        F: FnOnce(&'static TaggedField) -> Option<R>,
    {
        let Some(position) = self.schema.position(tag) else {
            warn!("{}: no field with tag {}", self.schema.name, tag);
            return Err(ErrorCode::InvalidArgument.into());
        };

        let field = &self.schema.fields[position];

        let Some(result) = f(field) else {
            warn!(
                "{}: field {} cannot be written as requested",
                self.schema.name, field.name
            );
            return Err(ErrorCode::InvalidArgument.into());
        };

        #[cfg(feature = "schema-check")]
        if self.written & field_bit(position) != 0 {
            warn!("{}: field {} written twice", self.schema.name, field.name);
            Err(ErrorCode::Duplicate)?;
        }

        self.written |= field_bit(position);

        Ok(result)
    }

    fn record<F>(&mut self, f: F)
    where
        F: FnOnce(&mut W) -> Result<(), Error>,
    {
        if self.error.is_none() {
            if let Err(err) = f(&mut *self.tw) {
                self.error = Some(err.code());
            }
        }
    }

    fn fail(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err.code());
        }
    }
}

impl<W> Drop for StructBuilder<'_, W>
where
    W: TLVWrite,
{
    fn drop(&mut self) {
        if !self.ended && cfg!(feature = "schema-check") {
            poison(self.schema.name, &mut self.parent);
        }
    }
}

/// A writer of the anonymous elements of a repeated field.
pub struct ListBuilder<'a, W>
where
    W: TLVWrite,
{
    field: &'static TaggedField,
    tw: &'a mut W,
    error: Option<ErrorCode>,
    parent: Option<&'a mut Option<ErrorCode>>,
    ended: bool,
}

/// What a `ListBuilder` is bound to when its field could not be resolved.
const INVALID_LIST: TaggedField = TaggedField::optional(0, "Invalid", FieldKind::Array);

impl<'a, W> ListBuilder<'a, W>
where
    W: TLVWrite,
{
    fn child(
        field: &'static TaggedField,
        tw: &'a mut W,
        tag: &TLVTag,
        parent: Option<&'a mut Option<ErrorCode>>,
        error: Option<ErrorCode>,
    ) -> Self {
        let mut this = Self {
            field,
            tw,
            error,
            parent,
            ended: false,
        };

        let container = field.kind.container_type().unwrap_or(TLVValueType::Array);
        this.record(|tw| tw.start_container(tag, container));

        this
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.item(FieldKind::UInt, |tw| tw.u32(&TLVTag::Anonymous, value))
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.item(FieldKind::UInt, |tw| tw.u64(&TLVTag::Anonymous, value))
    }

    /// Start a structure element, written with the element schema of the field.
    pub fn create_struct(&mut self) -> StructBuilder<'_, W> {
        let schema = match self.field.nested {
            Some(schema) => schema,
            None => {
                warn!("{}: elements are not structures", self.field.name);
                self.fail(ErrorCode::InvalidArgument.into());
                &StructSchema::EMPTY
            }
        };

        let error = self.error;

        StructBuilder::child(
            schema,
            &mut *self.tw,
            &TLVTag::Anonymous,
            Some(&mut self.error),
            error,
        )
    }

    /// Write the end of the field; see `StructBuilder::end`.
    pub fn end(mut self) -> Result<(), Error> {
        self.ended = true;

        self.record(|tw| tw.end_container());

        let error = self.error;

        if let Some(parent) = self.parent.take() {
            if parent.is_none() {
                *parent = error;
            }
        }

        error.map_or(Ok(()), |code| Err(code.into()))
    }

    fn item<F>(&mut self, kind: FieldKind, f: F) -> &mut Self
    where
        F: FnOnce(&mut W) -> Result<(), Error>,
    {
        if self.field.item == kind || self.field.item == FieldKind::Any {
            self.record(f);
        } else {
            warn!("{}: elements should be {}", self.field.name, self.field.item);
            self.fail(ErrorCode::InvalidArgument.into());
        }

        self
    }

    fn record<F>(&mut self, f: F)
    where
        F: FnOnce(&mut W) -> Result<(), Error>,
    {
        if self.error.is_none() {
            if let Err(err) = f(&mut *self.tw) {
                self.error = Some(err.code());
            }
        }
    }

    fn fail(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err.code());
        }
    }
}

impl<W> Drop for ListBuilder<'_, W>
where
    W: TLVWrite,
{
    fn drop(&mut self) {
        if !self.ended && cfg!(feature = "schema-check") {
            poison(self.field.name, &mut self.parent);
        }
    }
}

fn poison(name: &str, parent: &mut Option<&mut Option<ErrorCode>>) {
    if let Some(parent) = parent.as_mut() {
        if parent.is_none() {
            warn!("{}: dropped without being ended", name);
            **parent = Some(ErrorCode::InvalidState);
        }
    }
}

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

use log::{debug, warn};

use crate::error::{Error, ErrorCode};
use crate::tlv::{TLVElement, TLVSequence, TLVSequenceIter, TLVTag};

use super::{Cardinality, FieldKind, StructSchema, TaggedField};

#[cfg(feature = "schema-check")]
use crate::tlv::TLVValueType;

#[cfg(feature = "schema-check")]
use super::{field_bit, SchemaMode, MAX_SCHEMA_FIELDS};

/// A schema-aware, read-only view over an encoded TLV structure.
///
/// The parser never copies: every value it returns borrows the buffer the
/// structure was parsed from.
#[derive(Clone, Debug)]
pub struct StructParser<'a> {
    schema: &'static StructSchema,
    seq: TLVSequence<'a>,
    iter: TLVSequenceIter<'a>,
}

impl<'a> StructParser<'a> {
    /// Bind `schema` to `element`, which has to be a container of the schema's
    /// container kind, properly closed.
    pub fn new(schema: &'static StructSchema, element: &TLVElement<'a>) -> Result<Self, Error> {
        let value_type = element.control()?.value_type;

        if !schema.container.matches(value_type) {
            warn!(
                "{}: expected a {} container, got {}",
                schema.name, schema.container, value_type
            );
            Err(ErrorCode::TLVTypeMismatch)?;
        }

        // Fails on a missing end marker
        element.raw_value()?;

        Ok(Self::from_sequence(schema, element.container()?))
    }

    /// Bind `schema` to the content of an already-entered container.
    pub fn from_sequence(schema: &'static StructSchema, seq: TLVSequence<'a>) -> Self {
        Self {
            schema,
            iter: seq.iter(),
            seq,
        }
    }

    pub fn schema(&self) -> &'static StructSchema {
        self.schema
    }

    /// Advance to the next field of the structure, known or not.
    ///
    /// Returns `Ok(None)` once all fields were visited.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<ParsedField<'a>>, Error> {
        let Some(element) = self.iter.next().transpose()? else {
            return Ok(None);
        };

        let field = element.try_ctx()?.and_then(|tag| self.schema.field(tag));

        Ok(Some(ParsedField { element, field }))
    }

    /// Restart the `next` cursor from the first field.
    pub fn rewind(&mut self) {
        self.iter = self.seq.iter();
    }

    /// Look up the field with tag `tag`.
    ///
    /// - `Ok(None)` if the field is optional and absent;
    /// - `Err(ErrorCode::TLVNotFound)` if the field is mandatory and absent;
    /// - `Err(ErrorCode::InvalidArgument)` if the schema has no such field;
    /// - `Err(ErrorCode::TLVTypeMismatch)` if the element is not of the declared kind.
    pub fn get(&self, tag: u8) -> Result<Option<TLVElement<'a>>, Error> {
        let field = self.field(tag)?;
        let element = self.seq.find_ctx(tag)?;

        if element.is_empty() {
            if field.is_mandatory() {
                debug!("{}: mandatory field {} missing", self.schema.name, field.name);
                Err(ErrorCode::TLVNotFound)?;
            }

            return Ok(None);
        }

        check_kind(self.schema, field, &element)?;

        Ok(Some(element))
    }

    pub fn get_u64(&self, tag: u8) -> Result<Option<u64>, Error> {
        self.get(tag)?.map(|element| element.u64()).transpose()
    }

    pub fn get_u32(&self, tag: u8) -> Result<Option<u32>, Error> {
        self.get(tag)?.map(|element| element.u32()).transpose()
    }

    pub fn get_u16(&self, tag: u8) -> Result<Option<u16>, Error> {
        self.get(tag)?.map(|element| element.u16()).transpose()
    }

    pub fn get_u8(&self, tag: u8) -> Result<Option<u8>, Error> {
        self.get(tag)?.map(|element| element.u8()).transpose()
    }

    pub fn get_bool(&self, tag: u8) -> Result<Option<bool>, Error> {
        self.get(tag)?.map(|element| element.bool()).transpose()
    }

    pub fn get_utf8(&self, tag: u8) -> Result<Option<&'a str>, Error> {
        self.get(tag)?.map(|element| element.utf8()).transpose()
    }

    pub fn get_octets(&self, tag: u8) -> Result<Option<&'a [u8]>, Error> {
        self.get(tag)?.map(|element| element.str()).transpose()
    }

    /// Look up a nested structure field and bind its schema.
    pub fn get_nested(&self, tag: u8) -> Result<Option<StructParser<'a>>, Error> {
        let field = self.field(tag)?;
        let nested = match (field.cardinality, field.nested) {
            (Cardinality::Scalar, Some(nested)) => nested,
            _ => Err(ErrorCode::InvalidArgument)?,
        };

        self.get(tag)?
            .map(|element| StructParser::new(nested, &element))
            .transpose()
    }

    /// Look up a repeated field.
    pub fn get_list(&self, tag: u8) -> Result<Option<ListParser<'a>>, Error> {
        let field = self.field(tag)?;

        if field.cardinality != Cardinality::List {
            Err(ErrorCode::InvalidArgument)?;
        }

        self.get(tag)?
            .map(|element| ListParser::new(field, &element))
            .transpose()
    }

    /// Run a full validation pass over the structure.
    ///
    /// Every field of the schema which is present is checked against its
    /// declared kind, nested structures recursively. Fails with
    /// - `ErrorCode::Duplicate` if a known tag occurs twice at one level;
    /// - `ErrorCode::TLVNotFound` if a mandatory tag is missing;
    /// - `ErrorCode::InvalidData` for an unknown tag inside a nested
    ///   structure, in `SchemaMode::Strict` only.
    ///
    /// Unknown tags at the top level are skipped.
    #[cfg(feature = "schema-check")]
    pub fn check_schema_validity(&self, mode: SchemaMode) -> Result<(), Error> {
        validate(self.schema, &self.seq, mode, false)
    }

    fn field(&self, tag: u8) -> Result<&'static TaggedField, Error> {
        self.schema.field(tag).ok_or_else(|| {
            debug!("{}: no field with tag {}", self.schema.name, tag);
            ErrorCode::InvalidArgument.into()
        })
    }
}

/// One field of a structure, as returned by `StructParser::next`.
#[derive(Clone, Debug)]
pub struct ParsedField<'a> {
    element: TLVElement<'a>,
    field: Option<&'static TaggedField>,
}

impl<'a> ParsedField<'a> {
    pub fn tag(&self) -> Result<TLVTag, Error> {
        self.element.tag()
    }

    /// The schema declaration of this field, or `None` for a tag the schema does not know.
    pub fn field(&self) -> Option<&'static TaggedField> {
        self.field
    }

    pub fn element(&self) -> &TLVElement<'a> {
        &self.element
    }

    pub fn u64(&self) -> Result<u64, Error> {
        self.expect(FieldKind::UInt)?.u64()
    }

    pub fn u32(&self) -> Result<u32, Error> {
        self.expect(FieldKind::UInt)?.u32()
    }

    pub fn u16(&self) -> Result<u16, Error> {
        self.expect(FieldKind::UInt)?.u16()
    }

    pub fn u8(&self) -> Result<u8, Error> {
        self.expect(FieldKind::UInt)?.u8()
    }

    pub fn bool(&self) -> Result<bool, Error> {
        self.expect(FieldKind::Bool)?.bool()
    }

    pub fn utf8(&self) -> Result<&'a str, Error> {
        self.expect(FieldKind::Utf8)?.utf8()
    }

    pub fn octets(&self) -> Result<&'a [u8], Error> {
        self.expect(FieldKind::Octets)?.str()
    }

    /// Bind the nested schema of a structure field.
    pub fn nested(&self) -> Result<StructParser<'a>, Error> {
        let field = self.field.ok_or(ErrorCode::InvalidArgument)?;
        let nested = field.nested.ok_or(ErrorCode::InvalidArgument)?;

        if field.cardinality != Cardinality::Scalar {
            Err(ErrorCode::InvalidArgument)?;
        }

        StructParser::new(nested, &self.element)
    }

    /// Iterate over the elements of a repeated field.
    pub fn list(&self) -> Result<ListParser<'a>, Error> {
        let field = self.field.ok_or(ErrorCode::InvalidArgument)?;

        if field.cardinality != Cardinality::List {
            Err(ErrorCode::InvalidArgument)?;
        }

        ListParser::new(field, &self.element)
    }

    fn expect(&self, kind: FieldKind) -> Result<&TLVElement<'a>, Error> {
        if let Some(field) = self.field {
            if field.kind != kind {
                Err(ErrorCode::TLVTypeMismatch)?;
            }
        }

        Ok(&self.element)
    }
}

/// A cursor over the anonymous elements of a repeated field.
#[derive(Clone, Debug)]
pub struct ListParser<'a> {
    item: FieldKind,
    nested: Option<&'static StructSchema>,
    iter: TLVSequenceIter<'a>,
}

impl<'a> ListParser<'a> {
    fn new(field: &'static TaggedField, element: &TLVElement<'a>) -> Result<Self, Error> {
        element.raw_value()?;

        Ok(Self {
            item: field.item,
            nested: field.nested,
            iter: element.container()?.iter(),
        })
    }

    /// The next element, checked against the declared element kind.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<TLVElement<'a>>, Error> {
        let Some(element) = self.iter.next().transpose()? else {
            return Ok(None);
        };

        if !self.item.matches(element.control()?.value_type) {
            Err(ErrorCode::TLVTypeMismatch)?;
        }

        Ok(Some(element))
    }

    /// The next element, bound to the element schema.
    pub fn next_struct(&mut self) -> Result<Option<StructParser<'a>>, Error> {
        let nested = self.nested.ok_or(ErrorCode::InvalidArgument)?;

        self.next()?
            .map(|element| StructParser::new(nested, &element))
            .transpose()
    }

    pub fn next_u32(&mut self) -> Result<Option<u32>, Error> {
        self.next()?.map(|element| element.u32()).transpose()
    }

    pub fn next_u64(&mut self) -> Result<Option<u64>, Error> {
        self.next()?.map(|element| element.u64()).transpose()
    }
}

fn check_kind(
    schema: &StructSchema,
    field: &TaggedField,
    element: &TLVElement<'_>,
) -> Result<(), Error> {
    let value_type = element.control()?.value_type;

    if !field.accepts(value_type) {
        warn!(
            "{}: field {} should be {}, got {}",
            schema.name, field.name, field.kind, value_type
        );
        Err(ErrorCode::TLVTypeMismatch)?;
    }

    Ok(())
}

#[cfg(feature = "schema-check")]
fn validate(
    schema: &StructSchema,
    seq: &TLVSequence<'_>,
    mode: SchemaMode,
    nested: bool,
) -> Result<(), Error> {
    if schema.fields.len() > MAX_SCHEMA_FIELDS {
        warn!(
            "{}: {} fields do not fit the validation bitmap",
            schema.name,
            schema.fields.len()
        );
        Err(ErrorCode::InvalidArgument)?;
    }

    let mut seen = 0_u32;

    for element in seq.iter() {
        let element = element?;

        let position = element
            .try_ctx()?
            .and_then(|tag| schema.position(tag));

        let Some(position) = position else {
            if nested && mode == SchemaMode::Strict {
                warn!("{}: unknown element {}", schema.name, element.tag()?);
                Err(ErrorCode::InvalidData)?;
            }

            debug!("{}: skipping unknown element {}", schema.name, element.tag()?);

            // Still has to be well-formed
            element.raw_value()?;
            continue;
        };

        let field = &schema.fields[position];
        let bit = field_bit(position);

        if seen & bit != 0 {
            warn!("{}: duplicate field {}", schema.name, field.name);
            Err(ErrorCode::Duplicate)?;
        }

        seen |= bit;

        validate_field(schema, field, &element, mode)?;
    }

    for (position, field) in schema.fields.iter().enumerate() {
        if field.is_mandatory() && seen & field_bit(position) == 0 {
            warn!("{}: mandatory field {} missing", schema.name, field.name);
            Err(ErrorCode::TLVNotFound)?;
        }
    }

    Ok(())
}

#[cfg(feature = "schema-check")]
fn validate_field(
    schema: &StructSchema,
    field: &TaggedField,
    element: &TLVElement<'_>,
    mode: SchemaMode,
) -> Result<(), Error> {
    check_kind(schema, field, element)?;

    // Fails on truncated values and unterminated containers
    element.raw_value()?;

    if element.control()?.value_type == TLVValueType::Null {
        return Ok(());
    }

    match (field.cardinality, field.nested) {
        (Cardinality::Scalar, Some(nested)) => validate(nested, &element.container()?, mode, true),
        (Cardinality::Scalar, None) => Ok(()),
        (Cardinality::List, nested) => {
            for item in element.container()?.iter() {
                let item = item?;
                let value_type = item.control()?.value_type;

                if !field.item.matches(value_type) {
                    warn!(
                        "{}: element of {} should be {}, got {}",
                        schema.name, field.name, field.item, value_type
                    );
                    Err(ErrorCode::TLVTypeMismatch)?;
                }

                if let Some(nested) = nested {
                    validate(nested, &item.container()?, mode, true)?;
                }
            }

            Ok(())
        }
    }
}

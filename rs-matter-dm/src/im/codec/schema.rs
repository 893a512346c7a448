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

use crate::error::{Error, ErrorCode};
use crate::tlv::TLVValueType;

use super::MAX_SCHEMA_FIELDS;

/// The kind of value a schema field holds.
///
/// A kind covers all TLV encodings of the value: `UInt` accepts any of the
/// `U8` .. `U64` encodings, `Utf8` any of the UTF-8 string length variants, etc.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldKind {
    Bool,
    UInt,
    Int,
    Utf8,
    Octets,
    Null,
    Struct,
    Array,
    List,
    /// Any value, including containers. Used for opaque payloads.
    Any,
}

impl FieldKind {
    /// Return `true` if a TLV element of type `value_type` is a valid encoding of this kind.
    pub fn matches(&self, value_type: TLVValueType) -> bool {
        match self {
            Self::Bool => value_type.is_bool(),
            Self::UInt => value_type.is_uint(),
            Self::Int => value_type.is_int(),
            Self::Utf8 => value_type.is_utf8(),
            Self::Octets => value_type.is_str(),
            Self::Null => value_type == TLVValueType::Null,
            Self::Struct => value_type == TLVValueType::Struct,
            Self::Array => value_type == TLVValueType::Array,
            Self::List => value_type == TLVValueType::List,
            Self::Any => !value_type.is_container_end(),
        }
    }

    /// The TLV container type a field of this kind is encoded as, if it is a container.
    pub const fn container_type(&self) -> Option<TLVValueType> {
        match self {
            Self::Struct => Some(TLVValueType::Struct),
            Self::Array => Some(TLVValueType::Array),
            Self::List => Some(TLVValueType::List),
            _ => None,
        }
    }

    pub const fn is_container(&self) -> bool {
        self.container_type().is_some()
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Presence {
    Mandatory,
    Optional,
}

/// Whether a container field holds a single value or repeats its elements.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Cardinality {
    Scalar,
    /// The field is an array or a list whose anonymous elements are all of the
    /// field's `item` kind.
    List,
}

/// How schema validation treats tags it does not know.
///
/// Unknown tags at the top level of a message are always tolerated, so that
/// newer peers can add fields. Inside the known sub-structures of a message
/// the policy is selectable.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchemaMode {
    /// Skip unknown tags at every nesting level.
    #[default]
    Tolerant,
    /// Reject unknown tags inside nested sub-structures with `ErrorCode::InvalidData`.
    Strict,
}

/// A field of a `StructSchema`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TaggedField {
    pub tag: u8,
    pub name: &'static str,
    pub kind: FieldKind,
    pub presence: Presence,
    pub cardinality: Cardinality,
    /// The kind of the elements of a `Cardinality::List` field.
    pub item: FieldKind,
    /// Whether a `null` may stand in for the value.
    pub nullable: bool,
    /// The schema of the value (scalar container fields) or of each element (list fields).
    pub nested: Option<&'static StructSchema>,
}

impl TaggedField {
    pub const fn mandatory(tag: u8, name: &'static str, kind: FieldKind) -> Self {
        Self::new(tag, name, kind, Presence::Mandatory)
    }

    pub const fn optional(tag: u8, name: &'static str, kind: FieldKind) -> Self {
        Self::new(tag, name, kind, Presence::Optional)
    }

    const fn new(tag: u8, name: &'static str, kind: FieldKind, presence: Presence) -> Self {
        Self {
            tag,
            name,
            kind,
            presence,
            cardinality: Cardinality::Scalar,
            item: FieldKind::Any,
            nullable: false,
            nested: None,
        }
    }

    /// Turn an array or list field into a repeated field with elements of kind `item`.
    pub const fn list(self, item: FieldKind) -> Self {
        Self {
            cardinality: Cardinality::List,
            item,
            ..self
        }
    }

    /// Bind the schema of the value, or of each element for a repeated field.
    pub const fn nested(self, schema: &'static StructSchema) -> Self {
        Self {
            nested: Some(schema),
            ..self
        }
    }

    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    pub const fn is_mandatory(&self) -> bool {
        matches!(self.presence, Presence::Mandatory)
    }

    /// Return `true` if a TLV element of type `value_type` is a valid encoding of this field.
    pub fn accepts(&self, value_type: TLVValueType) -> bool {
        self.kind.matches(value_type) || (self.nullable && value_type == TLVValueType::Null)
    }
}

/// The ordered field declarations of one TLV structure.
///
/// Schemas are `const` data, and nesting them (through `TaggedField::nested`)
/// forms the tree of a complete message.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StructSchema {
    pub name: &'static str,
    /// The container the fields live in; `Struct` for most IBs, `List` for the paths.
    pub container: FieldKind,
    pub fields: &'static [TaggedField],
}

impl StructSchema {
    pub const EMPTY: Self = Self::new("Empty", &[]);

    pub const fn new(name: &'static str, fields: &'static [TaggedField]) -> Self {
        Self {
            name,
            container: FieldKind::Struct,
            fields,
        }
    }

    pub const fn list(name: &'static str, fields: &'static [TaggedField]) -> Self {
        Self {
            name,
            container: FieldKind::List,
            fields,
        }
    }

    pub fn field(&self, tag: u8) -> Option<&'static TaggedField> {
        self.fields.iter().find(|field| field.tag == tag)
    }

    /// The index of the field with tag `tag` in the declaration order.
    pub fn position(&self, tag: u8) -> Option<usize> {
        self.fields.iter().position(|field| field.tag == tag)
    }

    pub fn mandatory_tags(&self) -> impl Iterator<Item = u8> + 'static {
        self.fields
            .iter()
            .filter(|field| field.is_mandatory())
            .map(|field| field.tag)
    }

    /// Return `true` if no two fields of this level share a tag.
    pub const fn has_unique_tags(&self) -> bool {
        let mut i = 0;

        while i < self.fields.len() {
            let mut j = i + 1;

            while j < self.fields.len() {
                if self.fields[i].tag == self.fields[j].tag {
                    return false;
                }

                j += 1;
            }

            i += 1;
        }

        true
    }

    /// Return `true` if this level has unique tags and fits the validation bitmap.
    ///
    /// Meant to be used in a `const` assertion next to the schema declaration.
    pub const fn is_well_formed(&self) -> bool {
        self.fields.len() <= MAX_SCHEMA_FIELDS && self.has_unique_tags()
    }

    /// Check this schema and all schemas nested in it.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.is_well_formed() {
            ::log::warn!("Schema {} has duplicate tags or too many fields", self.name);
            Err(ErrorCode::Duplicate)?;
        }

        for field in self.fields {
            if field.nested.is_some() && !(field.kind.is_container() || field.item.is_container())
            {
                ::log::warn!(
                    "Schema {}: field {} binds a schema but is not a container",
                    self.name,
                    field.name
                );
                Err(ErrorCode::InvalidArgument)?;
            }

            if let Some(nested) = field.nested {
                nested.validate()?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INNER: StructSchema = StructSchema::list(
        "Inner",
        &[
            TaggedField::optional(0, "A", FieldKind::UInt),
            TaggedField::optional(1, "B", FieldKind::Bool),
        ],
    );

    const OUTER: StructSchema = StructSchema::new(
        "Outer",
        &[
            TaggedField::mandatory(0, "Items", FieldKind::Array)
                .list(FieldKind::List)
                .nested(&INNER),
            TaggedField::optional(1, "Index", FieldKind::UInt).nullable(),
        ],
    );

    const DUPLICATE: StructSchema = StructSchema::new(
        "Duplicate",
        &[
            TaggedField::mandatory(3, "A", FieldKind::UInt),
            TaggedField::optional(3, "B", FieldKind::UInt),
        ],
    );

    const _: () = assert!(OUTER.is_well_formed());
    const _: () = assert!(!DUPLICATE.has_unique_tags());

    #[test]
    fn test_field_lookup() {
        assert_eq!(OUTER.field(1).unwrap().name, "Index");
        assert_eq!(OUTER.position(1), Some(1));
        assert!(OUTER.field(2).is_none());

        let tags: heapless::Vec<u8, 4> = OUTER.mandatory_tags().collect();
        assert_eq!(tags.as_slice(), &[0]);
    }

    #[test]
    fn test_validate() {
        OUTER.validate().unwrap();
        assert_eq!(DUPLICATE.validate().unwrap_err().code(), ErrorCode::Duplicate);

        const BAD_NESTING: StructSchema = StructSchema::new(
            "BadNesting",
            &[TaggedField::optional(0, "A", FieldKind::UInt).nested(&INNER)],
        );
        assert_eq!(
            BAD_NESTING.validate().unwrap_err().code(),
            ErrorCode::InvalidArgument
        );
    }

    #[test]
    fn test_kind_matches() {
        assert!(FieldKind::UInt.matches(TLVValueType::U8));
        assert!(FieldKind::UInt.matches(TLVValueType::U64));
        assert!(!FieldKind::UInt.matches(TLVValueType::S8));
        assert!(FieldKind::Octets.matches(TLVValueType::Str16l));
        assert!(!FieldKind::Octets.matches(TLVValueType::Utf8l));
        assert!(FieldKind::Utf8.matches(TLVValueType::Utf8l));
        assert!(!FieldKind::Any.matches(TLVValueType::EndCnt));

        let index = OUTER.field(1).unwrap();
        assert!(index.accepts(TLVValueType::Null));
        assert!(!OUTER.field(0).unwrap().accepts(TLVValueType::Null));
    }
}

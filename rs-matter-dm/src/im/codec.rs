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

//! A generic, schema-driven parser and builder for TLV structures.
//!
//! Every Interaction Model message is a TLV structure with a fixed set of
//! numbered fields. Rather than hand-writing a parser and a builder per
//! message, a message is described once as a `const` [`StructSchema`] and
//! the generic [`StructParser`] / [`StructBuilder`] pair is bound to it:
//!
//! - the parser hands out [`ParsedField`] handles from `next()` and typed
//!   `get_*` lookups which distinguish an absent optional field (`Ok(None)`)
//!   from malformed data (`Err`);
//! - the builder is append-only; nested builders mutably borrow their parent,
//!   so a nested structure has to be ended before its parent can continue.

pub use builder::*;
pub use parser::*;
pub use schema::*;

mod builder;
mod parser;
mod schema;

/// The maximum number of fields a single `StructSchema` level may declare.
///
/// Schema validation tracks the fields seen in a `u32` bitmap.
pub const MAX_SCHEMA_FIELDS: usize = 32;

/// The bitmap bit of the field at `position`, zero past `MAX_SCHEMA_FIELDS`.
pub(crate) const fn field_bit(position: usize) -> u32 {
    if position < MAX_SCHEMA_FIELDS {
        1 << position
    } else {
        0
    }
}

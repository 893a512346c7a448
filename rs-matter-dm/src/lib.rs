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

//! The data-model codec and access gate of a native Rust Matter stack.
//!
//! This crate covers the part of the stack that sits between a decrypted
//! exchange and the application clusters:
//!
//! - [`im::codec`]: a schema-driven parser/builder pair for TLV structures,
//!   used by every Interaction Model message (see [`im::read`] for the
//!   Read Request message).
//! - [`dm::list_attr`]: the fixed-layout marshaller for list attributes
//!   stored in flat attribute buffers.
//! - [`dm::access`] and [`acl`]: the static privilege table and the gate
//!   that admits or rejects an operation before any payload is decoded.
//!
//! # Examples
//! ```
//! use rs_matter_dm::im::read::ReadRequestBuilder;
//! use rs_matter_dm::im::paths::AttrPath;
//! use rs_matter_dm::utils::storage::WriteBuf;
//!
//! let mut buf = [0; 64];
//! let mut wb = WriteBuf::new(&mut buf);
//!
//! let mut req = ReadRequestBuilder::new(&mut wb);
//! {
//!     let mut paths = req.create_attribute_path_list_builder();
//!     AttrPath::new(Some(1), Some(0x0006), Some(0))
//!         .write_to(&mut paths)
//!         .unwrap();
//!     paths.end().unwrap();
//! }
//! req.event_number(42);
//! req.end_of_read_request_message().unwrap();
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![allow(clippy::new_without_default)]

pub mod acl;
pub mod dm;
pub mod error;
pub mod fabric;
pub mod im;
pub mod tlv;
pub mod transport;
pub mod utils;

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

//! Data model types: element ids, privileges, the privilege table and the
//! list attribute marshaller.

pub use privilege::*;

pub mod access;
pub mod clusters;
pub mod list_attr;

mod privilege;

pub type ClusterId = u32;
pub type AttrId = u32;
pub type CmdId = u32;
pub type EventId = u32;
pub type EndptId = u16;
pub type NodeId = u64;
pub type FabricId = u64;
pub type VendorId = u16;

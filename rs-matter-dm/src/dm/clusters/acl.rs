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

use strum::FromRepr;

pub const ID: u32 = 0x001F;

#[derive(FromRepr, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum AttributeId {
    Acl = 0x00,
    Extension = 0x01,
    SubjectsPerAccessControlEntry = 0x02,
    TargetsPerAccessControlEntry = 0x03,
    AccessControlEntriesPerFabric = 0x04,
}

#[derive(FromRepr, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum EventId {
    AccessControlEntryChanged = 0x00,
    AccessControlExtensionChanged = 0x01,
}

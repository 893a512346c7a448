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

//! The static privilege table consulted before any cluster element is accessed.

use core::fmt;

use crate::dm::{ClusterId, Privilege};

mod generated;

/// The kind of access an operation performs on a cluster element.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccessKind {
    ReadAttribute,
    WriteAttribute,
    InvokeCommand,
    ReadEvent,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadAttribute => write!(f, "read attribute"),
            Self::WriteAttribute => write!(f, "write attribute"),
            Self::InvokeCommand => write!(f, "invoke command"),
            Self::ReadEvent => write!(f, "read event"),
        }
    }
}

/// One row of the table: the privilege required to access `element` of `cluster`.
///
/// `element` is an attribute, command or event id depending on the row set.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PrivilegeRule {
    pub cluster: ClusterId,
    pub element: u32,
    pub privilege: Privilege,
}

impl PrivilegeRule {
    pub const fn new(cluster: ClusterId, element: u32, privilege: Privilege) -> Self {
        Self {
            cluster,
            element,
            privilege,
        }
    }
}

/// The privileges required by the elements of a device, one row set per access kind.
///
/// Only elements whose required privilege differs from the default policy have
/// a row. The table is plain `'static` data with no interior mutability, so it
/// can be shared and looked up from any number of threads.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct PrivilegeTable {
    pub read_attribute: &'static [PrivilegeRule],
    pub write_attribute: &'static [PrivilegeRule],
    pub invoke_command: &'static [PrivilegeRule],
    pub read_event: &'static [PrivilegeRule],
}

impl PrivilegeTable {
    pub const EMPTY: Self = Self {
        read_attribute: &[],
        write_attribute: &[],
        invoke_command: &[],
        read_event: &[],
    };

    pub const fn rules(&self, kind: AccessKind) -> &'static [PrivilegeRule] {
        match kind {
            AccessKind::ReadAttribute => self.read_attribute,
            AccessKind::WriteAttribute => self.write_attribute,
            AccessKind::InvokeCommand => self.invoke_command,
            AccessKind::ReadEvent => self.read_event,
        }
    }

    /// The privilege required for `kind` access to `element` of `cluster`,
    /// or `None` if the table has no explicit rule for it.
    pub fn lookup(&self, kind: AccessKind, cluster: ClusterId, element: u32) -> Option<Privilege> {
        self.rules(kind)
            .iter()
            .find(|rule| rule.cluster == cluster && rule.element == element)
            .map(|rule| rule.privilege)
    }
}

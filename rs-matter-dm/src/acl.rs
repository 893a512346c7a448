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

//! The access gate that admits or rejects an operation on a cluster element
//! before any of its payload is decoded.

use core::cell::RefCell;
use core::num::NonZeroU8;

use log::{debug, warn};

use crate::dm::access::{AccessKind, PrivilegeTable};
use crate::dm::{ClusterId, Privilege};
use crate::error::{Error, ErrorCode};
use crate::fabric::FabricMgr;
use crate::transport::session::Session;

/// The Accessor Object
pub struct Accessor<'a> {
    /// The fabric index of the accessor, 0 if none
    pub fab_idx: u8,
    /// The privilege established for the session of the accessor
    privilege: Privilege,
    fabric_mgr: &'a RefCell<FabricMgr>,
}

impl<'a> Accessor<'a> {
    pub fn for_session(session: &Session, fabric_mgr: &'a RefCell<FabricMgr>) -> Self {
        Self::new(
            session.get_local_fabric_idx(),
            session.privilege(),
            fabric_mgr,
        )
    }

    pub const fn new(fab_idx: u8, privilege: Privilege, fabric_mgr: &'a RefCell<FabricMgr>) -> Self {
        Self {
            fab_idx,
            privilege,
            fabric_mgr,
        }
    }

    pub fn privilege(&self) -> Privilege {
        self.privilege
    }

    /// Return `true` if the fabric of the accessor is one the device belongs to.
    pub fn has_fabric(&self) -> bool {
        NonZeroU8::new(self.fab_idx)
            .map(|fab_idx| self.fabric_mgr.borrow().get_fabric(fab_idx).is_some())
            .unwrap_or(false)
    }
}

/// Access Request Object
pub struct AccessReq<'a> {
    accessor: &'a Accessor<'a>,
    cluster: ClusterId,
    element: u32,
    kind: AccessKind,
}

impl<'a> AccessReq<'a> {
    /// Creates an access request object
    ///
    /// An access request specifies the _accessor_ attempting `kind` access
    /// to `element` (an attribute, command or event id) of `cluster`.
    pub fn new(accessor: &'a Accessor, cluster: ClusterId, element: u32, kind: AccessKind) -> Self {
        Self {
            accessor,
            cluster,
            element,
            kind,
        }
    }

    pub fn accessor(&self) -> &Accessor<'a> {
        self.accessor
    }

    pub fn cluster(&self) -> ClusterId {
        self.cluster
    }

    pub fn element(&self) -> u32 {
        self.element
    }

    pub fn kind(&self) -> AccessKind {
        self.kind
    }

    /// Checks if access is allowed by the gate of the device
    pub fn allow(&self) -> bool {
        AccessGate::DEFAULT.allow(self)
    }
}

/// The privilege required by elements the privilege table has no row for.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DefaultPolicy {
    /// The same privilege for every kind of access.
    Require(Privilege),
    /// View for reads, operate for writes and invokes.
    PerKind,
}

impl DefaultPolicy {
    pub const fn privilege(&self, kind: AccessKind) -> Privilege {
        match self {
            Self::Require(privilege) => *privilege,
            Self::PerKind => match kind {
                AccessKind::ReadAttribute | AccessKind::ReadEvent => Privilege::VIEW,
                AccessKind::WriteAttribute | AccessKind::InvokeCommand => Privilege::OPERATE,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct AccessGate {
    pub table: &'static PrivilegeTable,
    pub default: DefaultPolicy,
}

impl AccessGate {
    /// The gate of the device, over the generated privilege table.
    pub const DEFAULT: Self = Self::new(&PrivilegeTable::GENERATED, DefaultPolicy::PerKind);

    pub const fn new(table: &'static PrivilegeTable, default: DefaultPolicy) -> Self {
        Self { table, default }
    }

    /// The privilege `req` needs, from the table or the default policy.
    pub fn required(&self, req: &AccessReq) -> Privilege {
        self.table
            .lookup(req.kind, req.cluster, req.element)
            .unwrap_or_else(|| self.default.privilege(req.kind))
    }

    /// Admit or reject `req`.
    ///
    /// The request is rejected when the accessor has no fabric, when its
    /// fabric is not one the device belongs to, or when its privilege does
    /// not satisfy the required one.
    pub fn check(&self, req: &AccessReq) -> Result<(), Error> {
        let accessor = req.accessor;

        if !accessor.has_fabric() {
            warn!(
                "Denied {} {:#06x}/{:#06x}: {:?} for fabric index {}",
                req.kind,
                req.cluster,
                req.element,
                ErrorCode::NoFabricId,
                accessor.fab_idx
            );

            return Err(ErrorCode::UnsupportedAccess.into());
        }

        let required = self.required(req);

        if !accessor.privilege.satisfies(required) {
            debug!(
                "Denied {} {:#06x}/{:#06x}: required {:?}, have {:?}",
                req.kind, req.cluster, req.element, required, accessor.privilege
            );

            return Err(ErrorCode::UnsupportedAccess.into());
        }

        Ok(())
    }

    pub fn allow(&self, req: &AccessReq) -> bool {
        self.check(req).is_ok()
    }

    /// Run `f`, usually the decoding of the request payload, only if `req` is admitted.
    pub fn gate<F, R>(&self, req: &AccessReq, f: F) -> Result<R, Error>
    where
        F: FnOnce() -> Result<R, Error>,
    {
        self.check(req)?;

        f()
    }
}

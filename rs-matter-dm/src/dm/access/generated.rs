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

// The privilege rows of the light switch device type. Elements without a row
// fall back to the access gate's default policy.

use crate::dm::clusters::{acl, noc};
use crate::dm::Privilege;

use super::{PrivilegeRule, PrivilegeTable};

const READ_ATTRIBUTE: &[PrivilegeRule] = &[
    PrivilegeRule::new(acl::ID, acl::AttributeId::Acl as _, Privilege::ADMIN),
    PrivilegeRule::new(acl::ID, acl::AttributeId::Extension as _, Privilege::ADMIN),
    PrivilegeRule::new(noc::ID, noc::AttributeId::NOCs as _, Privilege::ADMIN),
];

const WRITE_ATTRIBUTE: &[PrivilegeRule] = &[
    PrivilegeRule::new(acl::ID, acl::AttributeId::Acl as _, Privilege::ADMIN),
    PrivilegeRule::new(acl::ID, acl::AttributeId::Extension as _, Privilege::ADMIN),
];

const INVOKE_COMMAND: &[PrivilegeRule] = &[
    PrivilegeRule::new(noc::ID, noc::CommandId::AttestationRequest as _, Privilege::ADMIN),
    PrivilegeRule::new(noc::ID, noc::CommandId::CertChainRequest as _, Privilege::ADMIN),
    PrivilegeRule::new(noc::ID, noc::CommandId::CSRRequest as _, Privilege::ADMIN),
    PrivilegeRule::new(noc::ID, noc::CommandId::AddNOC as _, Privilege::ADMIN),
    PrivilegeRule::new(noc::ID, noc::CommandId::UpdateNOC as _, Privilege::ADMIN),
    PrivilegeRule::new(noc::ID, noc::CommandId::UpdateFabricLabel as _, Privilege::ADMIN),
    PrivilegeRule::new(noc::ID, noc::CommandId::RemoveFabric as _, Privilege::ADMIN),
    PrivilegeRule::new(noc::ID, noc::CommandId::AddTrustedRootCert as _, Privilege::ADMIN),
    PrivilegeRule::new(noc::ID, noc::CommandId::RemoveTrustedRootCert as _, Privilege::ADMIN),
];

const READ_EVENT: &[PrivilegeRule] = &[
    PrivilegeRule::new(
        acl::ID,
        acl::EventId::AccessControlEntryChanged as _,
        Privilege::ADMIN,
    ),
    PrivilegeRule::new(
        acl::ID,
        acl::EventId::AccessControlExtensionChanged as _,
        Privilege::ADMIN,
    ),
];

impl PrivilegeTable {
    pub const GENERATED: Self = Self {
        read_attribute: READ_ATTRIBUTE,
        write_attribute: WRITE_ATTRIBUTE,
        invoke_command: INVOKE_COMMAND,
        read_event: READ_EVENT,
    };
}

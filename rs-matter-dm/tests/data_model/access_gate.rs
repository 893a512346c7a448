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

use core::cell::RefCell;
use core::num::NonZeroU8;

use rs_matter_dm::acl::{AccessGate, AccessReq, Accessor, DefaultPolicy};
use rs_matter_dm::dm::access::{AccessKind, PrivilegeTable};
use rs_matter_dm::dm::clusters::{acl, noc, ota_requestor};
use rs_matter_dm::dm::Privilege;
use rs_matter_dm::error::ErrorCode;
use rs_matter_dm::fabric::{Fabric, FabricMgr};
use rs_matter_dm::transport::session::{Session, SessionMode};

use crate::common::init_env_logger;

const FAB_1: NonZeroU8 = match NonZeroU8::new(1) {
    Some(f) => f,
    None => unreachable!(),
};

fn fabric_mgr() -> RefCell<FabricMgr> {
    let mut mgr = FabricMgr::new();
    mgr.add(Fabric::new(&[0x04; 65], 0xFFF1, 0xABCD, 0x0102, "home").unwrap())
        .unwrap();

    RefCell::new(mgr)
}

fn case(privilege: Privilege) -> Session {
    Session::new(
        SessionMode::Case {
            fab_idx: FAB_1,
            privilege,
        },
        Some(0x0102),
    )
}

#[test]
/// The literal rows of the generated table: reading the ACL attribute and
/// invoking AttestationRequest both need administer
fn admin_only_elements() {
    init_env_logger();

    let fm = fabric_mgr();
    let gate = AccessGate::DEFAULT;

    for (privilege, allowed) in [
        (Privilege::VIEW, false),
        (Privilege::OPERATE, false),
        (Privilege::MANAGE, false),
        (Privilege::ADMIN, true),
    ] {
        let accessor = Accessor::for_session(&case(privilege), &fm);

        let read_acl = AccessReq::new(
            &accessor,
            acl::ID,
            acl::AttributeId::Acl as _,
            AccessKind::ReadAttribute,
        );
        let attestation = AccessReq::new(
            &accessor,
            noc::ID,
            noc::CommandId::AttestationRequest as _,
            AccessKind::InvokeCommand,
        );

        assert_eq!(gate.allow(&read_acl), allowed);
        assert_eq!(gate.allow(&attestation), allowed);
        assert_eq!(read_acl.allow(), allowed);
    }
}

fn read_commissioned_fabrics<'a>(accessor: &'a Accessor<'a>) -> AccessReq<'a> {
    AccessReq::new(
        accessor,
        noc::ID,
        noc::AttributeId::CommissionedFabrics as _,
        AccessKind::ReadAttribute,
    )
}

fn announce_ota_provider<'a>(accessor: &'a Accessor<'a>) -> AccessReq<'a> {
    AccessReq::new(
        accessor,
        ota_requestor::ID,
        ota_requestor::CommandId::AnnounceOtaProvider as _,
        AccessKind::InvokeCommand,
    )
}

#[test]
fn default_policy_for_unlisted_elements() {
    init_env_logger();

    let fm = fabric_mgr();
    let view = Accessor::for_session(&case(Privilege::VIEW), &fm);
    let operate = Accessor::for_session(&case(Privilege::OPERATE), &fm);

    // Not in the table: view for reads, operate for invokes
    assert!(AccessGate::DEFAULT.allow(&read_commissioned_fabrics(&view)));
    assert!(!AccessGate::DEFAULT.allow(&announce_ota_provider(&view)));
    assert!(AccessGate::DEFAULT.allow(&announce_ota_provider(&operate)));

    let strict = AccessGate::new(
        &PrivilegeTable::GENERATED,
        DefaultPolicy::Require(Privilege::ADMIN),
    );
    assert!(!strict.allow(&read_commissioned_fabrics(&operate)));
}

#[test]
fn deny_without_fabric() {
    init_env_logger();

    let fm = fabric_mgr();

    // The fabric was removed after the session was established
    let stale = case(Privilege::ADMIN);
    let accessor = Accessor::for_session(&stale, &fm);
    let req = AccessReq::new(
        &accessor,
        acl::ID,
        acl::AttributeId::Extension as _,
        AccessKind::WriteAttribute,
    );
    assert!(req.allow());

    fm.borrow_mut().remove(FAB_1).unwrap();

    assert_eq!(
        AccessGate::DEFAULT.check(&req).unwrap_err().code(),
        ErrorCode::UnsupportedAccess
    );

    // A PASE session before AddNOC has no fabric yet
    let pase = Session::new(SessionMode::Pase { fab_idx: 0 }, None);
    let accessor = Accessor::for_session(&pase, &fm);
    assert!(!AccessReq::new(
        &accessor,
        noc::ID,
        noc::CommandId::CSRRequest as _,
        AccessKind::InvokeCommand,
    )
    .allow());
}

#[test]
fn reject_before_decode() {
    init_env_logger();

    let fm = fabric_mgr();
    let accessor = Accessor::for_session(&case(Privilege::VIEW), &fm);
    let req = AccessReq::new(
        &accessor,
        noc::ID,
        noc::CommandId::RemoveFabric as _,
        AccessKind::InvokeCommand,
    );

    let mut decoded = 0;
    let res = AccessGate::DEFAULT.gate(&req, || {
        decoded += 1;
        Ok(())
    });

    assert_eq!(res.unwrap_err().code(), ErrorCode::UnsupportedAccess);
    assert_eq!(decoded, 0);
}

#[test]
fn concurrent_lookups() {
    init_env_logger();

    let expected = PrivilegeTable::GENERATED.lookup(
        AccessKind::ReadEvent,
        acl::ID,
        acl::EventId::AccessControlExtensionChanged as _,
    );
    assert_eq!(expected, Some(Privilege::ADMIN));

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    (0..1000)
                        .map(|_| {
                            PrivilegeTable::GENERATED.lookup(
                                AccessKind::ReadEvent,
                                acl::ID,
                                acl::EventId::AccessControlExtensionChanged as _,
                            )
                        })
                        .all(|privilege| privilege == expected)
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    });
}

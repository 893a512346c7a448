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

use core::num::NonZeroU8;

use embassy_futures::select::select;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_time::{Duration, Timer};

use rs_matter_dm::dm::clusters::ota_requestor::{
    AnnounceOtaProvider, AnnouncementReason, OtaRequestor, OtaRequestorConfig, ProviderLocation,
};
use rs_matter_dm::dm::Privilege;
use rs_matter_dm::error::ErrorCode;
use rs_matter_dm::fabric::{Fabric, FabricMgr};
use rs_matter_dm::tlv::{TLVElement, TLVTag};
use rs_matter_dm::transport::session::{Session, SessionMode};
use rs_matter_dm::utils::storage::WriteBuf;

use crate::common::init_env_logger;

const PROVIDER: u64 = 0x0000_0000_0000_00AA;

fn announce(provider_node_id: u64, reason: AnnouncementReason, buf: &mut [u8]) -> &[u8] {
    let mut wb = WriteBuf::new(buf);

    AnnounceOtaProvider {
        provider_node_id,
        vendor_id: 0xFFF1,
        announcement_reason: reason as _,
        metadata_for_node: Some(&[1, 2, 3]),
        endpoint: Some(0),
    }
    .encode(&mut wb, &TLVTag::Anonymous)
    .unwrap();

    let len = wb.get_tail();
    &buf[..len]
}

fn session(fab_idx: u8) -> Session {
    Session::new(
        SessionMode::Case {
            fab_idx: NonZeroU8::new(fab_idx).unwrap(),
            privilege: Privilege::ADMIN,
        },
        Some(PROVIDER),
    )
}

fn fabric_mgr() -> FabricMgr {
    let mut mgr = FabricMgr::new();
    mgr.add(Fabric::new(&[0x04; 65], 0xFFF1, 0x10, 0x20, "").unwrap())
        .unwrap();
    mgr
}

/// Run the requestor for `window`, collecting what it delivers
fn run_for(requestor: &OtaRequestor<NoopRawMutex>, window: Duration) -> Vec<ProviderLocation> {
    let mut delivered = Vec::new();

    futures_lite::future::block_on(select(
        requestor.run(|location| delivered.push(location)),
        Timer::after(window),
    ));

    delivered
}

#[test]
fn urgent_announcement_connects() {
    init_env_logger();

    let requestor = OtaRequestor::<NoopRawMutex>::new(OtaRequestorConfig {
        start_delay: Duration::from_secs(3600),
    });
    let fabric_mgr = fabric_mgr();

    let mut buf = [0; 64];
    let data = announce(PROVIDER, AnnouncementReason::UrgentUpdateAvailable, &mut buf);

    requestor
        .handle_announce(&session(1), &fabric_mgr, &TLVElement::new(data))
        .unwrap();
    assert!(requestor.is_connect_pending());

    let delivered = run_for(&requestor, Duration::from_millis(200));

    let expected = ProviderLocation {
        node_id: PROVIDER,
        fab_idx: 1,
    };
    assert_eq!(delivered, [expected]);
    assert!(!requestor.is_connect_pending());

    // The fabric is re-checked when connecting
    let fabric = expected.fabric(&fabric_mgr).unwrap();
    assert_eq!(fabric.get_fabric_id(), 0x10);
}

#[test]
fn latest_announcement_wins() {
    init_env_logger();

    let requestor = OtaRequestor::<NoopRawMutex>::new(OtaRequestorConfig {
        start_delay: Duration::from_millis(20),
    });
    let fabric_mgr = fabric_mgr();

    let mut buf = [0; 64];
    let first = announce(0x01, AnnouncementReason::SimpleAnnouncement, &mut buf);
    requestor
        .handle_announce(&session(1), &fabric_mgr, &TLVElement::new(first))
        .unwrap();

    let mut buf = [0; 64];
    let second = announce(0x02, AnnouncementReason::UpdateAvailable, &mut buf);
    requestor
        .handle_announce(&session(1), &fabric_mgr, &TLVElement::new(second))
        .unwrap();

    let delivered = run_for(&requestor, Duration::from_millis(300));

    assert_eq!(
        delivered,
        [ProviderLocation {
            node_id: 0x02,
            fab_idx: 1
        }]
    );
}

#[test]
fn unknown_fabric_is_lenient() {
    init_env_logger();

    let requestor = OtaRequestor::<NoopRawMutex>::new(OtaRequestorConfig::default());
    let fabric_mgr = fabric_mgr();

    let mut buf = [0; 64];
    let data = announce(PROVIDER, AnnouncementReason::UrgentUpdateAvailable, &mut buf);

    requestor
        .handle_announce(&session(3), &fabric_mgr, &TLVElement::new(data))
        .unwrap();

    assert_eq!(requestor.provider().map(|p| p.fab_idx), Some(3));
    assert!(!requestor.is_connect_pending());
    assert!(run_for(&requestor, Duration::from_millis(50)).is_empty());

    assert_eq!(
        requestor
            .provider()
            .unwrap()
            .fabric(&fabric_mgr)
            .unwrap_err()
            .code(),
        ErrorCode::NotFound
    );
}

#[test]
fn unknown_fabric_drops_pending_connect() {
    init_env_logger();

    let requestor = OtaRequestor::<NoopRawMutex>::new(OtaRequestorConfig {
        start_delay: Duration::from_millis(20),
    });
    let fabric_mgr = fabric_mgr();

    let mut buf = [0; 64];
    let first = announce(0x01, AnnouncementReason::SimpleAnnouncement, &mut buf);
    requestor
        .handle_announce(&session(1), &fabric_mgr, &TLVElement::new(first))
        .unwrap();
    assert!(requestor.is_connect_pending());

    let mut buf = [0; 64];
    let second = announce(0x02, AnnouncementReason::SimpleAnnouncement, &mut buf);
    requestor
        .handle_announce(&session(3), &fabric_mgr, &TLVElement::new(second))
        .unwrap();

    assert_eq!(
        requestor.provider(),
        Some(ProviderLocation {
            node_id: 0x02,
            fab_idx: 3
        })
    );
    assert!(!requestor.is_connect_pending());
    assert!(run_for(&requestor, Duration::from_millis(200)).is_empty());
}

#[test]
fn malformed_announcement_is_rejected() {
    init_env_logger();

    let requestor = OtaRequestor::<NoopRawMutex>::new(OtaRequestorConfig::default());
    let fabric_mgr = fabric_mgr();

    // {0: "x", 1: 0xFFF1, 2: 0}
    let data = [
        0x15, 0x2c, 0x00, 0x01, b'x', 0x25, 0x01, 0xf1, 0xff, 0x24, 0x02, 0x00, 0x18,
    ];

    assert_eq!(
        requestor
            .handle_announce(&session(1), &fabric_mgr, &TLVElement::new(&data))
            .unwrap_err()
            .code(),
        ErrorCode::TLVTypeMismatch
    );
    assert_eq!(requestor.provider(), None);
    assert!(!requestor.is_connect_pending());
}

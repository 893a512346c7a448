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

use rs_matter_dm::dm::clusters::noc::{self, FabricDescriptor, FABRICS_ENTRY_LEN};
use rs_matter_dm::dm::list_attr::{
    AttrMeta, ListAttributeMarshaller, ListCopy, ListEntry, NativeMut, NativeRef,
};
use rs_matter_dm::error::ErrorCode;
use rs_matter_dm::fabric::{Fabric, FabricMgr, MAX_SUPPORTED_FABRICS};

use crate::common::init_env_logger;

const MARSHALLER: ListAttributeMarshaller = ListAttributeMarshaller::DEFAULT;

const FABRICS: u32 = noc::AttributeId::Fabrics as _;

const BUF_LEN: usize = 2 + MAX_SUPPORTED_FABRICS * FABRICS_ENTRY_LEN as usize;

fn fabric_mgr() -> FabricMgr {
    let mut mgr = FabricMgr::new();

    mgr.add(Fabric::new(&[0x04; 65], 0xFFF1, 0x1000, 0x0001, "first").unwrap())
        .unwrap();
    mgr.add(Fabric::new(&[0x04, 0x01], 0xFFF2, 0x2000, 0x0002, "").unwrap())
        .unwrap();
    mgr.add(
        Fabric::new(
            &[0x04; 65],
            0xFFF3,
            u64::MAX,
            u64::MAX - 1,
            "0123456789abcdef0123456789abcdef",
        )
        .unwrap(),
    )
    .unwrap();

    mgr
}

fn meta() -> AttrMeta {
    AttrMeta {
        id: FABRICS,
        size: BUF_LEN as _,
    }
}

#[test]
fn fabrics_list_encode_decode() {
    init_env_logger();

    let mgr = fabric_mgr();

    let mut buf = [0; BUF_LEN];
    let size = noc::encode_fabrics(&mgr, &mut buf).unwrap();
    assert_eq!(size as usize, BUF_LEN);

    assert_eq!(MARSHALLER.entry_stride(noc::ID, FABRICS), 120);
    assert_eq!(
        MARSHALLER.list_size(noc::ID, FABRICS, &buf).unwrap() as usize,
        BUF_LEN
    );

    mgr.for_each(|fabric, fab_idx| {
        let decoded = noc::decode_fabric(&buf, fab_idx.get() as _)?;
        assert_eq!(decoded, fabric.descriptor(fab_idx));
        Ok(())
    })
    .unwrap();

    let third = noc::decode_fabric(&buf, 3).unwrap();
    assert_eq!(third.label.len(), 32);
    assert_eq!(third.fabric_id, u64::MAX);
}

#[test]
fn entry_reencode_is_idempotent() {
    init_env_logger();

    let mut buf = [0; BUF_LEN];
    noc::encode_fabrics(&fabric_mgr(), &mut buf).unwrap();

    let mut entry = ListEntry::new();
    let len = MARSHALLER
        .copy_list(
            noc::ID,
            &meta(),
            ListCopy::Read {
                wire: &buf,
                native: NativeMut::Entry(&mut entry),
            },
            2,
        )
        .unwrap();
    assert_eq!(len, FABRICS_ENTRY_LEN);

    let mut out = buf;
    out[2 + 120..2 + 240].fill(0xa5);

    MARSHALLER
        .copy_list(
            noc::ID,
            &meta(),
            ListCopy::Write {
                native: NativeRef::Entry(&entry),
                wire: &mut out,
            },
            2,
        )
        .unwrap();

    assert_eq!(out, buf);
}

#[test]
fn bulk_copy_matches_entries() {
    init_env_logger();

    let mut wire = [0; BUF_LEN];
    noc::encode_fabrics(&fabric_mgr(), &mut wire).unwrap();

    let mut native = [0; BUF_LEN];
    MARSHALLER
        .copy_list(
            noc::ID,
            &meta(),
            ListCopy::Read {
                wire: &wire,
                native: NativeMut::Raw(&mut native),
            },
            -1,
        )
        .unwrap();
    assert_eq!(native, wire);

    let mut count = 0;
    MARSHALLER
        .copy_list(
            noc::ID,
            &meta(),
            ListCopy::Read {
                wire: &native,
                native: NativeMut::Count(&mut count),
            },
            0,
        )
        .unwrap();
    assert_eq!(count as usize, MAX_SUPPORTED_FABRICS);

    for index in 1..=count {
        let desc = noc::decode_fabric(&native, index).unwrap();
        assert_eq!(desc.fab_idx as u16, index);
    }
}

#[test]
fn index_bounds() {
    init_env_logger();

    let mut buf = [0; BUF_LEN];
    noc::encode_fabrics(&fabric_mgr(), &mut buf).unwrap();

    // One past the declared size
    assert_eq!(
        noc::decode_fabric(&buf, MAX_SUPPORTED_FABRICS as u16 + 1)
            .unwrap_err()
            .code(),
        ErrorCode::BufferTooSmall
    );

    let mut entry = ListEntry::new();
    for index in [-2, 0x1_0000, 0xFFFF] {
        assert_eq!(
            MARSHALLER
                .copy_list(
                    noc::ID,
                    &meta(),
                    ListCopy::Read {
                        wire: &buf,
                        native: NativeMut::Entry(&mut entry),
                    },
                    index,
                )
                .unwrap_err()
                .code(),
            ErrorCode::InvalidArgument
        );
    }

    // The declared size is authoritative even if the buffer is larger
    let small = AttrMeta {
        id: FABRICS,
        size: 2 + FABRICS_ENTRY_LEN,
    };
    assert_eq!(
        MARSHALLER
            .copy_list(
                noc::ID,
                &small,
                ListCopy::Read {
                    wire: &buf,
                    native: NativeMut::Entry(&mut entry),
                },
                2,
            )
            .unwrap_err()
            .code(),
        ErrorCode::BufferTooSmall
    );
}

#[test]
fn invalid_and_non_list_attributes() {
    init_env_logger();

    let mut buf = [0; BUF_LEN];
    buf[..2].copy_from_slice(&[0xff, 0xff]);

    assert_eq!(MARSHALLER.list_size(noc::ID, FABRICS, &buf).unwrap(), 0);

    buf[..2].copy_from_slice(&[2, 0]);
    let nocs = noc::AttributeId::NOCs as u32;
    assert_eq!(MARSHALLER.entry_stride(noc::ID, nocs), 0);
    assert_eq!(MARSHALLER.list_size(noc::ID, nocs, &buf).unwrap(), 2);

    let mut entry = ListEntry::new();
    let len = MARSHALLER
        .copy_list(
            noc::ID,
            &AttrMeta {
                id: nocs,
                size: BUF_LEN as _,
            },
            ListCopy::Read {
                wire: &buf,
                native: NativeMut::Entry(&mut entry),
            },
            1,
        )
        .unwrap();
    assert_eq!(len, 0);
    assert!(entry.is_empty());
}

#[test]
fn oversized_label_is_rejected() {
    init_env_logger();

    let mut buf = [0; BUF_LEN];
    let label = [b'x'; 33];

    let desc = FabricDescriptor {
        fab_idx: 1,
        root_pubkey: &[0x04; 65],
        vendor_id: 0xFFF1,
        fabric_id: 1,
        node_id: 2,
        label: &label,
    };

    assert_eq!(
        MARSHALLER
            .copy_list(
                noc::ID,
                &meta(),
                ListCopy::Write {
                    native: NativeRef::Entry(&desc.to_entry()),
                    wire: &mut buf,
                },
                1,
            )
            .unwrap_err()
            .code(),
        ErrorCode::NoSpace
    );
    assert_eq!(buf, [0; BUF_LEN]);
}

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

use crate::dm::list_attr::{
    AttrMeta, FieldValue, FieldWidth, ListAttributeLayout, ListAttributeMarshaller, ListCopy,
    ListEntry, ListSubField, NativeMut, NativeRef, LIST_COUNT_LEN,
};
use crate::dm::{FabricId, NodeId, VendorId};
use crate::error::{Error, ErrorCode};
use crate::fabric::FabricMgr;

pub const ID: u32 = 0x003E;

#[derive(FromRepr, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum AttributeId {
    NOCs = 0x00,
    Fabrics = 0x01,
    SupportedFabrics = 0x02,
    CommissionedFabrics = 0x03,
    TrustedRootCertificates = 0x04,
    CurrentFabricIndex = 0x05,
}

#[derive(FromRepr, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum CommandId {
    AttestationRequest = 0x00,
    CertChainRequest = 0x02,
    CSRRequest = 0x04,
    AddNOC = 0x06,
    UpdateNOC = 0x07,
    UpdateFabricLabel = 0x09,
    RemoveFabric = 0x0a,
    AddTrustedRootCert = 0x0b,
    RemoveTrustedRootCert = 0x0c,
}

/// The stride of an entry of the `Fabrics` list attribute.
pub const FABRICS_ENTRY_LEN: u16 = 120;

/// The entry layout of the `Fabrics` list attribute.
pub const FABRICS_LAYOUT: ListAttributeLayout = ListAttributeLayout {
    cluster: ID,
    attr: AttributeId::Fabrics as _,
    stride: FABRICS_ENTRY_LEN,
    fields: &[
        ListSubField::new("FabricIndex", 0, FieldWidth::U8),
        ListSubField::new("RootPublicKey", 1, FieldWidth::Octets { slot: 67 }),
        ListSubField::new("VendorId", 68, FieldWidth::U16),
        ListSubField::new("FabricId", 70, FieldWidth::U64),
        ListSubField::new("NodeId", 78, FieldWidth::U64),
        ListSubField::new("Label", 86, FieldWidth::Octets { slot: 34 }),
    ],
};

const _: () = assert!(FABRICS_LAYOUT.is_consistent());

/// One entry of the `Fabrics` list attribute.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct FabricDescriptor<'a> {
    pub fab_idx: u8,
    pub root_pubkey: &'a [u8],
    pub vendor_id: VendorId,
    pub fabric_id: FabricId,
    pub node_id: NodeId,
    pub label: &'a [u8],
}

impl<'a> FabricDescriptor<'a> {
    pub fn to_entry(&self) -> ListEntry<'a> {
        [
            FieldValue::U8(self.fab_idx),
            FieldValue::Octets(self.root_pubkey),
            FieldValue::U16(self.vendor_id),
            FieldValue::U64(self.fabric_id),
            FieldValue::U64(self.node_id),
            FieldValue::Octets(self.label),
        ]
        .into_iter()
        .collect()
    }

    pub fn from_entry(entry: &[FieldValue<'a>]) -> Result<Self, Error> {
        let [FieldValue::U8(fab_idx), FieldValue::Octets(root_pubkey), FieldValue::U16(vendor_id), FieldValue::U64(fabric_id), FieldValue::U64(node_id), FieldValue::Octets(label)] =
            entry
        else {
            return Err(ErrorCode::InvalidData.into());
        };

        Ok(Self {
            fab_idx: *fab_idx,
            root_pubkey: *root_pubkey,
            vendor_id: *vendor_id,
            fabric_id: *fabric_id,
            node_id: *node_id,
            label: *label,
        })
    }
}

/// Encode all fabrics of `fabric_mgr` as a complete `Fabrics` list buffer.
///
/// Returns the size of the list, count header included.
pub fn encode_fabrics(fabric_mgr: &FabricMgr, buf: &mut [u8]) -> Result<u16, Error> {
    let marshaller = ListAttributeMarshaller::DEFAULT;
    let meta = fabrics_meta(buf.len());

    let mut count = 0;

    fabric_mgr.for_each(|fabric, fab_idx| {
        count += 1;

        let entry = fabric.descriptor(fab_idx).to_entry();

        marshaller.copy_list(
            ID,
            &meta,
            ListCopy::Write {
                native: NativeRef::Entry(&entry),
                wire: &mut *buf,
            },
            count,
        )?;

        Ok(())
    })?;

    marshaller.copy_list(
        ID,
        &meta,
        ListCopy::Write {
            native: NativeRef::Count(count as _),
            wire: &mut *buf,
        },
        0,
    )?;

    marshaller.list_size(ID, meta.id, buf)
}

/// Decode the entry at `index` (1-based) of the `Fabrics` list in `buf`.
pub fn decode_fabric(buf: &[u8], index: u16) -> Result<FabricDescriptor<'_>, Error> {
    let mut entry = ListEntry::new();

    ListAttributeMarshaller::DEFAULT.copy_list(
        ID,
        &fabrics_meta(buf.len()),
        ListCopy::Read {
            wire: buf,
            native: NativeMut::Entry(&mut entry),
        },
        index as _,
    )?;

    FabricDescriptor::from_entry(&entry)
}

fn fabrics_meta(len: usize) -> AttrMeta {
    AttrMeta {
        id: AttributeId::Fabrics as _,
        size: len.max(LIST_COUNT_LEN).min(u16::MAX as usize) as _,
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorCode;
    use crate::fabric::{Fabric, FabricMgr};

    use super::*;

    #[test]
    fn test_fabrics_entry_bytes() {
        let mut mgr = FabricMgr::new();
        mgr.add(
            Fabric::new(&[0x04, 0xaa, 0xbb], 0xFFF1, 0x0102030405060708, 0x1122, "lab").unwrap(),
        )
        .unwrap();

        let mut buf = [0; 2 + FABRICS_ENTRY_LEN as usize];
        assert_eq!(encode_fabrics(&mgr, &mut buf).unwrap(), 122);

        assert_eq!(&buf[..2], &[1, 0]);

        let entry = &buf[2..];
        assert_eq!(entry[0], 1);
        assert_eq!(&entry[1..6], &[3, 0, 0x04, 0xaa, 0xbb]);
        assert_eq!(&entry[68..70], &[0xf1, 0xff]);
        assert_eq!(&entry[70..78], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(&entry[78..86], &[0x22, 0x11, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&entry[86..91], &[3, 0, b'l', b'a', b'b']);
        assert!(entry[91..].iter().all(|b| *b == 0));

        let desc = decode_fabric(&buf, 1).unwrap();
        assert_eq!(desc.fab_idx, 1);
        assert_eq!(desc.root_pubkey, &[0x04, 0xaa, 0xbb]);
        assert_eq!(desc.vendor_id, 0xFFF1);
        assert_eq!(desc.fabric_id, 0x0102030405060708);
        assert_eq!(desc.node_id, 0x1122);
        assert_eq!(desc.label, b"lab");
    }

    #[test]
    fn test_fabrics_too_small() {
        let mut mgr = FabricMgr::new();
        mgr.add(Fabric::new(&[0x04; 65], 1, 1, 1, "a").unwrap())
            .unwrap();
        mgr.add(Fabric::new(&[0x04; 65], 2, 2, 2, "b").unwrap())
            .unwrap();

        let mut buf = [0; 2 + FABRICS_ENTRY_LEN as usize];
        assert_eq!(
            encode_fabrics(&mgr, &mut buf).unwrap_err().code(),
            ErrorCode::BufferTooSmall
        );

        assert_eq!(
            decode_fabric(&buf, 2).unwrap_err().code(),
            ErrorCode::BufferTooSmall
        );
    }

    #[test]
    fn test_descriptor_entry_shape() {
        let entry = [FieldValue::U8(1), FieldValue::U16(2)];
        assert_eq!(
            FabricDescriptor::from_entry(&entry).unwrap_err().code(),
            ErrorCode::InvalidData
        );
    }
}

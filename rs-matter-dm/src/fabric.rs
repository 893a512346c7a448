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

//! The fabrics the device is commissioned into.
//!
//! Only the fabric identity needed to resolve a session's fabric index and
//! to populate the fabrics list attribute is kept here. Certificate handling
//! and persistence live with the owner of the operational credentials.

use core::num::NonZeroU8;

use heapless::{String, Vec};

use log::info;

use crate::dm::clusters::noc::FabricDescriptor;
use crate::dm::{FabricId, NodeId, VendorId};
use crate::error::{Error, ErrorCode};

/// The maximum length of an uncompressed P-256 root public key.
pub const MAX_ROOT_PUBKEY_LEN: usize = 65;

/// The maximum length of a fabric label.
pub const MAX_FABRIC_LABEL_LEN: usize = 32;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Fabric {
    node_id: NodeId,
    fabric_id: FabricId,
    vendor_id: VendorId,
    root_pubkey: Vec<u8, MAX_ROOT_PUBKEY_LEN>,
    label: String<MAX_FABRIC_LABEL_LEN>,
}

impl Fabric {
    pub fn new(
        root_pubkey: &[u8],
        vendor_id: VendorId,
        fabric_id: FabricId,
        node_id: NodeId,
        label: &str,
    ) -> Result<Self, Error> {
        Ok(Self {
            node_id,
            fabric_id,
            vendor_id,
            root_pubkey: Vec::from_slice(root_pubkey).map_err(|_| ErrorCode::NoSpace)?,
            label: label.try_into().map_err(|_| ErrorCode::NoSpace)?,
        })
    }

    pub fn get_node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn get_fabric_id(&self) -> FabricId {
        self.fabric_id
    }

    pub fn get_vendor_id(&self) -> VendorId {
        self.vendor_id
    }

    pub fn get_root_pubkey(&self) -> &[u8] {
        &self.root_pubkey
    }

    pub fn get_label(&self) -> &str {
        &self.label
    }

    pub fn descriptor(&self, fab_idx: NonZeroU8) -> FabricDescriptor<'_> {
        FabricDescriptor {
            fab_idx: fab_idx.get(),
            root_pubkey: &self.root_pubkey,
            vendor_id: self.vendor_id,
            fabric_id: self.fabric_id,
            node_id: self.node_id,
            label: self.label.as_bytes(),
        }
    }
}

pub const MAX_SUPPORTED_FABRICS: usize = 3;

type FabricEntries = Vec<Option<Fabric>, MAX_SUPPORTED_FABRICS>;

pub struct FabricMgr {
    fabrics: FabricEntries,
}

impl Default for FabricMgr {
    fn default() -> Self {
        Self::new()
    }
}

impl FabricMgr {
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            fabrics: FabricEntries::new(),
        }
    }

    pub fn add(&mut self, f: Fabric) -> Result<NonZeroU8, Error> {
        // The position of the fabric in the array is its fabric index, so
        // freed slots are only reused once the array is full
        let index = if self.fabrics.len() < MAX_SUPPORTED_FABRICS {
            self.fabrics.push(None).map_err(|_| ErrorCode::NoSpace)?;
            self.fabrics.len() - 1
        } else {
            self.fabrics
                .iter()
                .position(Option::is_none)
                .ok_or(ErrorCode::NoSpace)?
        };

        info!(
            "Adding fabric {:#018x} at index {}",
            f.fabric_id,
            index + 1
        );

        self.fabrics[index] = Some(f);

        NonZeroU8::new(index as u8 + 1).ok_or_else(|| ErrorCode::InvalidState.into())
    }

    pub fn remove(&mut self, fab_idx: NonZeroU8) -> Result<(), Error> {
        let fabric = self
            .fabrics
            .get_mut(fab_idx.get() as usize - 1)
            .and_then(Option::take)
            .ok_or(ErrorCode::NotFound)?;

        info!(
            "Removed fabric {:#018x} at index {}",
            fabric.fabric_id, fab_idx
        );

        Ok(())
    }

    pub fn get_fabric(&self, idx: NonZeroU8) -> Option<&Fabric> {
        self.fabrics.get(idx.get() as usize - 1)?.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        !self.fabrics.iter().any(Option::is_some)
    }

    pub fn used_count(&self) -> usize {
        self.fabrics.iter().filter(|f| f.is_some()).count()
    }

    // Parameters to T are the Fabric and its Fabric Index
    pub fn for_each<T>(&self, mut f: T) -> Result<(), Error>
    where
        T: FnMut(&Fabric, NonZeroU8) -> Result<(), Error>,
    {
        for (index, fabric) in self.fabrics.iter().enumerate() {
            if let Some(fabric) = fabric {
                f(fabric, NonZeroU8::new(index as u8 + 1).ok_or(ErrorCode::InvalidState)?)?;
            }
        }

        Ok(())
    }

    pub fn set_label(&mut self, index: NonZeroU8, label: &str) -> Result<(), Error> {
        if !label.is_empty()
            && self
                .fabrics
                .iter()
                .filter_map(|f| f.as_ref())
                .any(|f| f.label == label)
        {
            return Err(ErrorCode::Invalid.into());
        }

        let fabric = self
            .fabrics
            .get_mut(index.get() as usize - 1)
            .and_then(Option::as_mut)
            .ok_or(ErrorCode::NotFound)?;

        fabric.label = label.try_into().map_err(|_| ErrorCode::NoSpace)?;

        Ok(())
    }
}

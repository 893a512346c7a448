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

//! The OTA Software Update Requestor side of provider announcements.
//!
//! An `AnnounceOTAProvider` command only records where the provider is and
//! arms a delayed connect: the actual query of the provider happens when the
//! callback fires, in whatever drives `OtaRequestor::run`.

use core::cell::Cell;
use core::num::NonZeroU8;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Duration;

use log::{error, info, warn};

use strum::FromRepr;

use crate::dm::{EndptId, NodeId, VendorId};
use crate::error::{Error, ErrorCode};
use crate::fabric::{Fabric, FabricMgr};
#[cfg(feature = "schema-check")]
use crate::im::codec::SchemaMode;
use crate::im::codec::{FieldKind, StructBuilder, StructParser, StructSchema, TaggedField};
use crate::tlv::{TLVElement, TLVTag, TLVWrite};
use crate::transport::session::Session;
use crate::utils::delayed::DelayedCallback;

pub const ID: u32 = 0x002A;

#[derive(FromRepr, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum AttributeId {
    DefaultOtaProviders = 0x00,
    UpdatePossible = 0x01,
    UpdateState = 0x02,
    UpdateStateProgress = 0x03,
}

#[derive(FromRepr, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum CommandId {
    AnnounceOtaProvider = 0x00,
}

#[derive(FromRepr, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AnnouncementReason {
    SimpleAnnouncement = 0,
    UpdateAvailable = 1,
    UrgentUpdateAvailable = 2,
}

pub mod tags {
    pub const PROVIDER_NODE_ID: u8 = 0;
    pub const VENDOR_ID: u8 = 1;
    pub const ANNOUNCEMENT_REASON: u8 = 2;
    pub const METADATA_FOR_NODE: u8 = 3;
    pub const ENDPOINT: u8 = 4;
}

pub const ANNOUNCE_OTA_PROVIDER: StructSchema = StructSchema::new(
    "AnnounceOtaProvider",
    &[
        TaggedField::mandatory(tags::PROVIDER_NODE_ID, "ProviderNodeId", FieldKind::UInt),
        TaggedField::mandatory(tags::VENDOR_ID, "VendorId", FieldKind::UInt),
        TaggedField::mandatory(
            tags::ANNOUNCEMENT_REASON,
            "AnnouncementReason",
            FieldKind::UInt,
        ),
        TaggedField::optional(tags::METADATA_FOR_NODE, "MetadataForNode", FieldKind::Octets),
        TaggedField::optional(tags::ENDPOINT, "Endpoint", FieldKind::UInt),
    ],
);

const _: () = assert!(ANNOUNCE_OTA_PROVIDER.is_well_formed());

/// The delay used for urgent announcements.
pub const IMMEDIATE_START_DELAY: Duration = Duration::from_millis(1);

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct OtaRequestorConfig {
    /// The delay between an announcement and the connect to the provider.
    pub start_delay: Duration,
}

impl OtaRequestorConfig {
    pub const fn new() -> Self {
        Self {
            start_delay: Duration::from_millis(0),
        }
    }
}

impl Default for OtaRequestorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The `AnnounceOTAProvider` command payload.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AnnounceOtaProvider<'a> {
    pub provider_node_id: NodeId,
    pub vendor_id: VendorId,
    /// Kept raw, as reasons unknown to this requestor are still accepted
    pub announcement_reason: u8,
    pub metadata_for_node: Option<&'a [u8]>,
    pub endpoint: Option<EndptId>,
}

impl<'a> AnnounceOtaProvider<'a> {
    pub fn decode(data: &TLVElement<'a>) -> Result<Self, Error> {
        let parser = StructParser::new(&ANNOUNCE_OTA_PROVIDER, data)?;

        #[cfg(feature = "schema-check")]
        parser.check_schema_validity(SchemaMode::Tolerant)?;

        Ok(Self {
            provider_node_id: parser
                .get_u64(tags::PROVIDER_NODE_ID)?
                .ok_or(ErrorCode::TLVNotFound)?,
            vendor_id: parser
                .get_u16(tags::VENDOR_ID)?
                .ok_or(ErrorCode::TLVNotFound)?,
            announcement_reason: parser
                .get_u8(tags::ANNOUNCEMENT_REASON)?
                .ok_or(ErrorCode::TLVNotFound)?,
            metadata_for_node: parser.get_octets(tags::METADATA_FOR_NODE)?,
            endpoint: parser.get_u16(tags::ENDPOINT)?,
        })
    }

    pub fn encode<W: TLVWrite>(&self, tw: &mut W, tag: &TLVTag) -> Result<(), Error> {
        let mut builder = StructBuilder::new(&ANNOUNCE_OTA_PROVIDER, tw, tag);

        builder
            .u64(tags::PROVIDER_NODE_ID, self.provider_node_id)
            .u16(tags::VENDOR_ID, self.vendor_id)
            .u8(tags::ANNOUNCEMENT_REASON, self.announcement_reason);

        if let Some(metadata) = self.metadata_for_node {
            builder.octets(tags::METADATA_FOR_NODE, metadata);
        }

        if let Some(endpoint) = self.endpoint {
            builder.u16(tags::ENDPOINT, endpoint);
        }

        builder.end()
    }

    pub fn reason(&self) -> Option<AnnouncementReason> {
        AnnouncementReason::from_repr(self.announcement_reason)
    }
}

/// The provider to connect to, as recorded from the last announcement.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProviderLocation {
    pub node_id: NodeId,
    pub fab_idx: u8,
}

impl ProviderLocation {
    /// The fabric of the provider, if the device still belongs to it.
    pub fn fabric<'f>(&self, fabric_mgr: &'f FabricMgr) -> Result<&'f Fabric, Error> {
        NonZeroU8::new(self.fab_idx)
            .and_then(|fab_idx| fabric_mgr.get_fabric(fab_idx))
            .ok_or_else(|| {
                error!("Cannot find fabric index {}", self.fab_idx);
                ErrorCode::NotFound.into()
            })
    }
}

pub struct OtaRequestor<M>
where
    M: RawMutex,
{
    config: OtaRequestorConfig,
    provider: Mutex<M, Cell<Option<ProviderLocation>>>,
    connect: DelayedCallback<M, ProviderLocation>,
}

impl<M> OtaRequestor<M>
where
    M: RawMutex,
{
    pub const fn new(config: OtaRequestorConfig) -> Self {
        Self {
            config,
            provider: Mutex::new(Cell::new(None)),
            connect: DelayedCallback::new(),
        }
    }

    /// The provider recorded from the last announcement.
    pub fn provider(&self) -> Option<ProviderLocation> {
        self.provider.lock(Cell::get)
    }

    pub fn is_connect_pending(&self) -> bool {
        self.connect.is_pending()
    }

    /// The delay before connecting to a provider announced for `reason`.
    pub fn start_delay(&self, reason: u8) -> Duration {
        match AnnouncementReason::from_repr(reason) {
            Some(AnnouncementReason::SimpleAnnouncement | AnnouncementReason::UpdateAvailable) => {
                self.config.start_delay
            }
            Some(AnnouncementReason::UrgentUpdateAvailable) => IMMEDIATE_START_DELAY,
            None => {
                warn!("Unknown announcement reason {}", reason);
                Duration::from_millis(0)
            }
        }
    }

    /// Handle an `AnnounceOTAProvider` command received on `session`.
    ///
    /// An announcement on a fabric the device does not belong to is logged and
    /// otherwise ignored: the command still succeeds but no connect is scheduled,
    /// and a connect pending for a previously announced provider is dropped.
    pub fn handle_announce(
        &self,
        session: &Session,
        fabric_mgr: &FabricMgr,
        data: &TLVElement,
    ) -> Result<(), Error> {
        let announce = AnnounceOtaProvider::decode(data)?;

        let location = ProviderLocation {
            node_id: announce.provider_node_id,
            fab_idx: session.get_local_fabric_idx(),
        };

        self.provider.lock(|provider| provider.set(Some(location)));

        let fabric = match location.fabric(fabric_mgr) {
            Ok(fabric) => fabric,
            Err(_) => {
                // The recorded provider changed, so the pending one is stale
                self.connect.cancel();
                return Ok(());
            }
        };

        info!(
            "Notifying OTA Provider node {:#018x} on fabric {:#018x} (index {}), vendor {:#06x}",
            location.node_id,
            fabric.get_fabric_id(),
            location.fab_idx,
            announce.vendor_id
        );

        let delay = self.start_delay(announce.announcement_reason);

        self.connect.schedule(delay, location);

        Ok(())
    }

    /// Deliver the provider of every announcement to `f` once its start delay elapses.
    pub async fn run<F>(&self, f: F)
    where
        F: FnMut(ProviderLocation),
    {
        self.connect.run(f).await
    }
}

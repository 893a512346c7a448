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

//! The attribute and event path IBs of the Interaction Model.

use crate::dm::{AttrId, ClusterId, EndptId, EventId, NodeId};
use crate::error::Error;
use crate::tlv::{TLVElement, TLVWrite};

use super::codec::{FieldKind, ListBuilder, StructParser, StructSchema, TaggedField};

pub mod attr_path_tags {
    pub const ENABLE_TAG_COMPRESSION: u8 = 0;
    pub const NODE: u8 = 1;
    pub const ENDPOINT: u8 = 2;
    pub const CLUSTER: u8 = 3;
    pub const ATTRIBUTE: u8 = 4;
    pub const LIST_INDEX: u8 = 5;
}

pub mod event_path_tags {
    pub const NODE: u8 = 0;
    pub const ENDPOINT: u8 = 1;
    pub const CLUSTER: u8 = 2;
    pub const EVENT: u8 = 3;
    pub const IS_URGENT: u8 = 4;
}

pub const ATTRIBUTE_PATH: StructSchema = StructSchema::list(
    "AttributePathIB",
    &[
        TaggedField::optional(
            attr_path_tags::ENABLE_TAG_COMPRESSION,
            "EnableTagCompression",
            FieldKind::Bool,
        ),
        TaggedField::optional(attr_path_tags::NODE, "Node", FieldKind::UInt),
        TaggedField::optional(attr_path_tags::ENDPOINT, "Endpoint", FieldKind::UInt),
        TaggedField::optional(attr_path_tags::CLUSTER, "Cluster", FieldKind::UInt),
        TaggedField::optional(attr_path_tags::ATTRIBUTE, "Attribute", FieldKind::UInt),
        TaggedField::optional(attr_path_tags::LIST_INDEX, "ListIndex", FieldKind::UInt).nullable(),
    ],
);

pub const EVENT_PATH: StructSchema = StructSchema::list(
    "EventPathIB",
    &[
        TaggedField::optional(event_path_tags::NODE, "Node", FieldKind::UInt),
        TaggedField::optional(event_path_tags::ENDPOINT, "Endpoint", FieldKind::UInt),
        TaggedField::optional(event_path_tags::CLUSTER, "Cluster", FieldKind::UInt),
        TaggedField::optional(event_path_tags::EVENT, "Event", FieldKind::UInt),
        TaggedField::optional(event_path_tags::IS_URGENT, "IsUrgent", FieldKind::Bool),
    ],
);

const _: () = assert!(ATTRIBUTE_PATH.is_well_formed());
const _: () = assert!(EVENT_PATH.is_well_formed());

/// The list index of an attribute path.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ListIndex {
    /// `null`: append to the list.
    Append,
    At(u16),
}

/// A decoded AttributePathIB. Absent fields are wildcards.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttrPath {
    pub tag_compression: Option<bool>,
    pub node: Option<NodeId>,
    pub endpoint: Option<EndptId>,
    pub cluster: Option<ClusterId>,
    pub attr: Option<AttrId>,
    pub list_index: Option<ListIndex>,
}

impl AttrPath {
    pub const fn new(
        endpoint: Option<EndptId>,
        cluster: Option<ClusterId>,
        attr: Option<AttrId>,
    ) -> Self {
        Self {
            tag_compression: None,
            node: None,
            endpoint,
            cluster,
            attr,
            list_index: None,
        }
    }

    /// Return `true` if the path can match more than one attribute.
    pub const fn is_wildcard(&self) -> bool {
        self.endpoint.is_none() || self.cluster.is_none() || self.attr.is_none()
    }

    pub fn from_tlv(element: &TLVElement) -> Result<Self, Error> {
        Self::from_parser(&StructParser::new(&ATTRIBUTE_PATH, element)?)
    }

    pub fn from_parser(parser: &StructParser) -> Result<Self, Error> {
        use attr_path_tags::*;

        let list_index = parser
            .get(LIST_INDEX)?
            .map(|element| {
                if element.is_null()? {
                    Ok(ListIndex::Append)
                } else {
                    element.u16().map(ListIndex::At)
                }
            })
            .transpose()?;

        Ok(Self {
            tag_compression: parser.get_bool(ENABLE_TAG_COMPRESSION)?,
            node: parser.get_u64(NODE)?,
            endpoint: parser.get_u16(ENDPOINT)?,
            cluster: parser.get_u32(CLUSTER)?,
            attr: parser.get_u32(ATTRIBUTE)?,
            list_index,
        })
    }

    /// Append this path as an element of `list`.
    pub fn write_to<W: TLVWrite>(&self, list: &mut ListBuilder<W>) -> Result<(), Error> {
        use attr_path_tags::*;

        let mut path = list.create_struct();

        if let Some(tag_compression) = self.tag_compression {
            path.bool(ENABLE_TAG_COMPRESSION, tag_compression);
        }

        if let Some(node) = self.node {
            path.u64(NODE, node);
        }

        if let Some(endpoint) = self.endpoint {
            path.u16(ENDPOINT, endpoint);
        }

        if let Some(cluster) = self.cluster {
            path.u32(CLUSTER, cluster);
        }

        if let Some(attr) = self.attr {
            path.u32(ATTRIBUTE, attr);
        }

        match self.list_index {
            Some(ListIndex::Append) => {
                path.null(LIST_INDEX);
            }
            Some(ListIndex::At(index)) => {
                path.u16(LIST_INDEX, index);
            }
            None => (),
        }

        path.end()
    }
}

/// A decoded EventPathIB. Absent fields are wildcards.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventPath {
    pub node: Option<NodeId>,
    pub endpoint: Option<EndptId>,
    pub cluster: Option<ClusterId>,
    pub event: Option<EventId>,
    pub is_urgent: Option<bool>,
}

impl EventPath {
    pub const fn new(
        endpoint: Option<EndptId>,
        cluster: Option<ClusterId>,
        event: Option<EventId>,
    ) -> Self {
        Self {
            node: None,
            endpoint,
            cluster,
            event,
            is_urgent: None,
        }
    }

    pub const fn is_wildcard(&self) -> bool {
        self.endpoint.is_none() || self.cluster.is_none() || self.event.is_none()
    }

    pub fn from_tlv(element: &TLVElement) -> Result<Self, Error> {
        Self::from_parser(&StructParser::new(&EVENT_PATH, element)?)
    }

    pub fn from_parser(parser: &StructParser) -> Result<Self, Error> {
        use event_path_tags::*;

        Ok(Self {
            node: parser.get_u64(NODE)?,
            endpoint: parser.get_u16(ENDPOINT)?,
            cluster: parser.get_u32(CLUSTER)?,
            event: parser.get_u32(EVENT)?,
            is_urgent: parser.get_bool(IS_URGENT)?,
        })
    }

    pub fn write_to<W: TLVWrite>(&self, list: &mut ListBuilder<W>) -> Result<(), Error> {
        use event_path_tags::*;

        let mut path = list.create_struct();

        if let Some(node) = self.node {
            path.u64(NODE, node);
        }

        if let Some(endpoint) = self.endpoint {
            path.u16(ENDPOINT, endpoint);
        }

        if let Some(cluster) = self.cluster {
            path.u32(CLUSTER, cluster);
        }

        if let Some(event) = self.event {
            path.u32(EVENT, event);
        }

        if let Some(is_urgent) = self.is_urgent {
            path.bool(IS_URGENT, is_urgent);
        }

        path.end()
    }
}

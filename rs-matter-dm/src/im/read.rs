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

//! The Read Request message of the Interaction Model.

use heapless::Vec;

use crate::error::{Error, ErrorCode};
use crate::tlv::{TLVElement, TLVTag, TLVWrite};

use super::codec::{
    FieldKind, ListBuilder, ListParser, SchemaMode, StructBuilder, StructParser, StructSchema,
    TaggedField,
};
use super::paths::{AttrPath, EventPath, ATTRIBUTE_PATH, EVENT_PATH};

/// The maximum number of paths (and data versions) an owned `ReadReq` holds.
pub const MAX_READ_PATHS: usize = 9;

pub mod tags {
    pub const ATTRIBUTE_REQUESTS: u8 = 0;
    pub const DATA_VERSION_FILTERS: u8 = 1;
    pub const EVENT_REQUESTS: u8 = 2;
    pub const EVENT_NUMBER: u8 = 3;
}

pub const READ_REQUEST: StructSchema = StructSchema::new(
    "ReadRequestMessage",
    &[
        TaggedField::mandatory(tags::ATTRIBUTE_REQUESTS, "AttributeRequests", FieldKind::Array)
            .list(FieldKind::List)
            .nested(&ATTRIBUTE_PATH),
        TaggedField::optional(
            tags::DATA_VERSION_FILTERS,
            "DataVersionFilters",
            FieldKind::Array,
        )
        .list(FieldKind::UInt),
        TaggedField::optional(tags::EVENT_REQUESTS, "EventRequests", FieldKind::Array)
            .list(FieldKind::List)
            .nested(&EVENT_PATH),
        TaggedField::optional(tags::EVENT_NUMBER, "EventNumber", FieldKind::UInt),
    ],
);

const _: () = assert!(READ_REQUEST.is_well_formed());

/// A borrowed, lazily decoded Read Request.
pub struct ReadRequestParser<'a>(StructParser<'a>);

impl<'a> ReadRequestParser<'a> {
    pub fn new(element: &TLVElement<'a>) -> Result<Self, Error> {
        Ok(Self(StructParser::new(&READ_REQUEST, element)?))
    }

    pub fn from_bytes(data: &'a [u8]) -> Result<Self, Error> {
        Self::new(&TLVElement::new(data))
    }

    #[cfg(feature = "schema-check")]
    pub fn check_schema_validity(&self, mode: SchemaMode) -> Result<(), Error> {
        self.0.check_schema_validity(mode)
    }

    /// The attribute paths; mandatory, so absence is an error.
    pub fn get_path_list(&self) -> Result<ListParser<'a>, Error> {
        self.0
            .get_list(tags::ATTRIBUTE_REQUESTS)?
            .ok_or_else(|| ErrorCode::TLVNotFound.into())
    }

    pub fn get_attribute_data_version_list(&self) -> Result<Option<ListParser<'a>>, Error> {
        self.0.get_list(tags::DATA_VERSION_FILTERS)
    }

    pub fn get_event_paths(&self) -> Result<Option<ListParser<'a>>, Error> {
        self.0.get_list(tags::EVENT_REQUESTS)
    }

    pub fn get_event_number(&self) -> Result<Option<u64>, Error> {
        self.0.get_u64(tags::EVENT_NUMBER)
    }
}

/// An append-only writer of a Read Request.
///
/// Each `create_*` call borrows the builder until the returned list builder is ended.
pub struct ReadRequestBuilder<'a, W>(StructBuilder<'a, W>)
where
    W: TLVWrite;

impl<'a, W> ReadRequestBuilder<'a, W>
where
    W: TLVWrite,
{
    pub fn new(tw: &'a mut W) -> Self {
        Self(StructBuilder::new(&READ_REQUEST, tw, &TLVTag::Anonymous))
    }

    pub fn create_attribute_path_list_builder(&mut self) -> ListBuilder<'_, W> {
        self.0.create_list(tags::ATTRIBUTE_REQUESTS)
    }

    pub fn create_attribute_data_version_list_builder(&mut self) -> ListBuilder<'_, W> {
        self.0.create_list(tags::DATA_VERSION_FILTERS)
    }

    pub fn create_event_paths_builder(&mut self) -> ListBuilder<'_, W> {
        self.0.create_list(tags::EVENT_REQUESTS)
    }

    /// The number of the last event already seen, to resume event reporting from.
    pub fn event_number(&mut self, event_number: u64) -> &mut Self {
        self.0.u64(tags::EVENT_NUMBER, event_number);
        self
    }

    pub fn end_of_read_request_message(self) -> Result<(), Error> {
        self.0.end()
    }
}

/// An owned Read Request.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct ReadReq {
    pub attr_requests: Vec<AttrPath, MAX_READ_PATHS>,
    pub data_versions: Option<Vec<u32, MAX_READ_PATHS>>,
    pub event_requests: Option<Vec<EventPath, MAX_READ_PATHS>>,
    pub event_number: Option<u64>,
}

impl ReadReq {
    /// Decode a Read Request, validating it against its schema first when
    /// the `schema-check` feature is enabled.
    pub fn decode(data: &[u8], mode: SchemaMode) -> Result<Self, Error> {
        let parser = ReadRequestParser::from_bytes(data)?;

        #[cfg(feature = "schema-check")]
        parser.check_schema_validity(mode)?;
        #[cfg(not(feature = "schema-check"))]
        let _ = mode;

        let mut attr_requests = Vec::new();
        let mut paths = parser.get_path_list()?;
        while let Some(path) = paths.next_struct()? {
            attr_requests
                .push(AttrPath::from_parser(&path)?)
                .map_err(|_| ErrorCode::NoSpace)?;
        }

        let data_versions = parser
            .get_attribute_data_version_list()?
            .map(|mut versions| {
                let mut data_versions = Vec::new();
                while let Some(version) = versions.next_u32()? {
                    data_versions
                        .push(version)
                        .map_err(|_| ErrorCode::NoSpace)?;
                }

                Ok::<_, Error>(data_versions)
            })
            .transpose()?;

        let event_requests = parser
            .get_event_paths()?
            .map(|mut paths| {
                let mut event_requests = Vec::new();
                while let Some(path) = paths.next_struct()? {
                    event_requests
                        .push(EventPath::from_parser(&path)?)
                        .map_err(|_| ErrorCode::NoSpace)?;
                }

                Ok::<_, Error>(event_requests)
            })
            .transpose()?;

        Ok(Self {
            attr_requests,
            data_versions,
            event_requests,
            event_number: parser.get_event_number()?,
        })
    }

    pub fn encode<W: TLVWrite>(&self, tw: &mut W) -> Result<(), Error> {
        let mut req = ReadRequestBuilder::new(tw);

        {
            let mut paths = req.create_attribute_path_list_builder();
            for path in &self.attr_requests {
                path.write_to(&mut paths)?;
            }
            paths.end()?;
        }

        if let Some(data_versions) = &self.data_versions {
            let mut versions = req.create_attribute_data_version_list_builder();
            for version in data_versions {
                versions.u32(*version);
            }
            versions.end()?;
        }

        if let Some(event_requests) = &self.event_requests {
            let mut paths = req.create_event_paths_builder();
            for path in event_requests {
                path.write_to(&mut paths)?;
            }
            paths.end()?;
        }

        if let Some(event_number) = self.event_number {
            req.event_number(event_number);
        }

        req.end_of_read_request_message()
    }
}

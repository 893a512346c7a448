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

use core::fmt;
use core::num::NonZeroU8;

use crate::dm::{NodeId, Privilege};

#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionMode {
    // The Case session captures the local fabric index
    // and the privilege granted to the peer on it
    Case {
        fab_idx: NonZeroU8,
        privilege: Privilege,
    },
    // The Pase session always starts with a fabric index of 0
    // (i.e. no fabric) but will be upgraded to the actual fabric index
    // once AddNOC or UpdateNOC is received
    Pase {
        fab_idx: u8,
    },
    #[default]
    PlainText,
}

impl SessionMode {
    pub fn fab_idx(&self) -> u8 {
        match self {
            SessionMode::Case { fab_idx, .. } => fab_idx.get(),
            SessionMode::Pase { fab_idx } => *fab_idx,
            SessionMode::PlainText => 0,
        }
    }

    pub fn privilege(&self) -> Privilege {
        match self {
            SessionMode::Case { privilege, .. } => *privilege,
            // Commissioning runs with administer privilege over PASE
            SessionMode::Pase { .. } => Privilege::ADMIN,
            SessionMode::PlainText => Privilege::empty(),
        }
    }
}

/// The state of an established session the access checks need.
#[derive(Debug, Clone, Default)]
pub struct Session {
    mode: SessionMode,
    peer_nodeid: Option<NodeId>,
}

impl Session {
    pub const fn new(mode: SessionMode, peer_nodeid: Option<NodeId>) -> Self {
        Self { mode, peer_nodeid }
    }

    pub fn get_peer_node_id(&self) -> Option<NodeId> {
        self.peer_nodeid
    }

    pub fn get_local_fabric_idx(&self) -> u8 {
        self.mode.fab_idx()
    }

    pub fn get_session_mode(&self) -> &SessionMode {
        &self.mode
    }

    pub fn set_session_mode(&mut self, mode: SessionMode) {
        self.mode = mode;
    }

    pub fn privilege(&self) -> Privilege {
        self.mode.privilege()
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer: {:?}, mode: {:?}", self.peer_nodeid, self.mode)
    }
}

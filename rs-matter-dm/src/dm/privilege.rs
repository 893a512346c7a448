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

use bitflags::bitflags;

bitflags! {
    /// The privilege of an accessor, or the privilege an operation requires.
    ///
    /// The constants are cumulative (`ADMIN` contains `MANAGE`, which contains
    /// `OPERATE`, which contains `VIEW`), so the total order of privileges is
    /// plain set inclusion.
    #[repr(transparent)]
    #[derive(Default, Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct Privilege: u8 {
        const V = 0x01;
        const O = 0x02;
        const M = 0x04;
        const A = 0x08;

        const VIEW = Self::V.bits();
        const OPERATE = Self::V.bits() | Self::O.bits();
        const MANAGE = Self::V.bits() | Self::O.bits() | Self::M.bits();
        const ADMIN = Self::V.bits() | Self::O.bits() | Self::M.bits() | Self::A.bits();
    }
}

impl Privilege {
    /// Return `true` if this privilege is at least `required`.
    pub const fn satisfies(&self, required: Privilege) -> bool {
        self.contains(required)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Privilege {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "Privilege({=u8:#x})", self.bits())
    }
}

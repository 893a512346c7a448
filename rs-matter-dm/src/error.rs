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

use core::{array::TryFromSliceError, fmt, str::Utf8Error};

/// The class of a failure, which decides how the caller reacts to it.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorClass {
    /// The input is not a valid encoding; the whole message is dropped.
    Malformed,
    /// An index or size is outside the declared buffer; nothing was copied.
    Bounds,
    /// The accessor may not perform the operation.
    Denied,
    /// The requested element does not exist.
    Missing,
    /// The caller broke the contract of the API.
    Usage,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    BufferTooSmall,
    Duplicate,
    InvalidArgument,
    Invalid,
    InvalidData,
    InvalidState,
    NoFabricId,
    NoSpace,
    NotFound,
    TLVNotFound,
    TLVTypeMismatch,
    UnsupportedAccess,
    Utf8Fail,
}

impl ErrorCode {
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Duplicate
            | Self::InvalidData
            | Self::TLVNotFound
            | Self::TLVTypeMismatch
            | Self::Utf8Fail => ErrorClass::Malformed,
            Self::BufferTooSmall | Self::NoSpace => ErrorClass::Bounds,
            Self::NoFabricId | Self::UnsupportedAccess => ErrorClass::Denied,
            Self::NotFound => ErrorClass::Missing,
            Self::InvalidArgument | Self::Invalid | Self::InvalidState => ErrorClass::Usage,
        }
    }

    const fn describe(&self) -> &'static str {
        match self {
            Self::BufferTooSmall => "entry outside the declared buffer",
            Self::Duplicate => "duplicate tag",
            Self::InvalidArgument => "invalid argument",
            Self::Invalid => "invalid value",
            Self::InvalidData => "invalid data",
            Self::InvalidState => "invalid state",
            Self::NoFabricId => "no such fabric",
            Self::NoSpace => "no space left",
            Self::NotFound => "not found",
            Self::TLVNotFound => "mandatory tag missing",
            Self::TLVTypeMismatch => "unexpected TLV type",
            Self::UnsupportedAccess => "access denied",
            Self::Utf8Fail => "invalid UTF-8",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.describe())
    }
}

impl From<ErrorCode> for Error {
    fn from(code: ErrorCode) -> Self {
        Self::new(code)
    }
}

pub struct Error {
    code: ErrorCode,
    #[cfg(all(feature = "std", feature = "backtrace"))]
    backtrace: std::backtrace::Backtrace,
}

impl Error {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            #[cfg(all(feature = "std", feature = "backtrace"))]
            backtrace: std::backtrace::Backtrace::capture(),
        }
    }

    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    pub const fn class(&self) -> ErrorClass {
        self.code.class()
    }

    #[cfg(all(feature = "std", feature = "backtrace"))]
    pub const fn backtrace(&self) -> &std::backtrace::Backtrace {
        &self.backtrace
    }
}

impl From<TryFromSliceError> for Error {
    fn from(_e: TryFromSliceError) -> Self {
        Self::new(ErrorCode::BufferTooSmall)
    }
}

impl From<Utf8Error> for Error {
    fn from(_e: Utf8Error) -> Self {
        Self::new(ErrorCode::Utf8Fail)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error::{:?}", self.code)?;

        #[cfg(all(feature = "std", feature = "backtrace"))]
        write!(f, "\n{}", self.backtrace)?;

        Ok(())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "Error::{}", self.code)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorClass, ErrorCode};

    #[test]
    fn test_class() {
        assert_eq!(Error::new(ErrorCode::Duplicate).class(), ErrorClass::Malformed);
        assert_eq!(ErrorCode::BufferTooSmall.class(), ErrorClass::Bounds);
        assert_eq!(ErrorCode::UnsupportedAccess.class(), ErrorClass::Denied);
        assert_eq!(ErrorCode::NotFound.class(), ErrorClass::Missing);
    }

    #[test]
    fn test_from_utf8() {
        let bytes = [0xc3, 0x28];
        let err: Error = core::str::from_utf8(&bytes).unwrap_err().into();
        assert_eq!(err.code(), ErrorCode::Utf8Fail);
        assert_eq!(err.class(), ErrorClass::Malformed);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_display() {
        let err = Error::new(ErrorCode::TLVNotFound);
        assert_eq!(std::format!("{}", err), "TLVNotFound (mandatory tag missing)");
    }
}

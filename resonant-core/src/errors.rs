// Resonant
// Copyright (c) 2024 The Project Resonant Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type.
//!
//! Conversion rules never fail. Errors are only reported by the layers that validate runtime
//! configuration and raw byte buffers before handing them to the conversion engine.

use std::error;
use std::fmt;
use std::result;

/// `Error` provides an enumeration of all possible errors reported by Resonant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An unsupported sample kind, format, policy, or dither algorithm was requested.
    Unsupported(&'static str),
    /// A textual configuration value was malformed.
    ParseError(&'static str),
    /// A raw byte buffer does not contain a whole number of samples.
    InvalidBufferLength {
        /// The length of the buffer in bytes.
        len: usize,
        /// The width of one sample in bytes.
        width: usize,
    },
    /// An output buffer is too small to hold the converted samples.
    BufferTooSmall {
        /// The number of bytes required.
        needed: usize,
        /// The number of bytes available.
        available: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Unsupported(feature) => {
                write!(f, "unsupported feature: {}", feature)
            }
            Error::ParseError(msg) => {
                write!(f, "malformed value: {}", msg)
            }
            Error::InvalidBufferLength { len, width } => {
                write!(f, "buffer length {} is not a multiple of the sample width {}", len, width)
            }
            Error::BufferTooSmall { needed, available } => {
                write!(f, "buffer too small: {} bytes needed, {} available", needed, available)
            }
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// Convenience function to create an unsupport feature error.
pub fn unsupported_error<T>(feature: &'static str) -> Result<T> {
    Err(Error::Unsupported(feature))
}

/// Convenience function to create a parse error.
pub fn parse_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::ParseError(desc))
}

/// Convenience function to create an invalid buffer length error.
pub fn buffer_length_error<T>(len: usize, width: usize) -> Result<T> {
    Err(Error::InvalidBufferLength { len, width })
}

/// Convenience function to create a buffer too small error.
pub fn buffer_size_error<T>(needed: usize, available: usize) -> Result<T> {
    Err(Error::BufferTooSmall { needed, available })
}

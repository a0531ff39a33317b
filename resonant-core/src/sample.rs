// Resonant
// Copyright (c) 2024 The Project Resonant Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `sample` module defines the audio sample trait and implements any non-primitive sample data
//! types.
//!
//! Four sample kinds are supported: signed 16-bit, 24-bit, and 32-bit integers, and 32-bit floating
//! point. Integer samples span their full two's complement range, floating point samples span
//! `[-1.0, 1.0]`.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use crate::batch::{Batch, LaneValue};
use crate::endian::{ByteSwap, WireWord};
use crate::errors::{unsupported_error, Error, Result};
use crate::util::bits::{mask_lower_u32, sign_extend_leq32_to_i32};

/// An enumeration of the sample kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Signed 16-bit integer.
    Int16,
    /// Signed 24-bit integer, packed into 3 bytes.
    Int24,
    /// Signed 32-bit integer.
    Int32,
    /// Single precision (32-bit) floating point.
    Float32,
}

impl Kind {
    /// All sample kinds.
    pub const ALL: [Kind; 4] = [Kind::Int16, Kind::Int24, Kind::Int32, Kind::Float32];

    /// The width of one sample of this kind in bytes.
    pub fn width(&self) -> usize {
        match self {
            Kind::Int16 => 2,
            Kind::Int24 => 3,
            Kind::Int32 => 4,
            Kind::Float32 => 4,
        }
    }

    /// The number of bits in one sample of this kind.
    pub fn bits(&self) -> u32 {
        8 * self.width() as u32
    }

    /// Returns true if this is an integer kind.
    pub fn is_integer(&self) -> bool {
        !matches!(self, Kind::Float32)
    }

    /// The smallest value of an integer kind.
    pub fn int_min(&self) -> Option<i32> {
        match self {
            Kind::Int16 => Some(i32::from(i16::MIN)),
            Kind::Int24 => Some(i24::MIN.inner()),
            Kind::Int32 => Some(i32::MIN),
            Kind::Float32 => None,
        }
    }

    /// The largest value of an integer kind.
    pub fn int_max(&self) -> Option<i32> {
        match self {
            Kind::Int16 => Some(i32::from(i16::MAX)),
            Kind::Int24 => Some(i24::MAX.inner()),
            Kind::Int32 => Some(i32::MAX),
            Kind::Float32 => None,
        }
    }

    /// A short, stable name for the kind.
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Int16 => "s16",
            Kind::Int24 => "s24",
            Kind::Int32 => "s32",
            Kind::Float32 => "f32",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "s16" | "i16" | "int16" => Ok(Kind::Int16),
            "s24" | "i24" | "int24" => Ok(Kind::Int24),
            "s32" | "i32" | "int32" => Ok(Kind::Int32),
            "f32" | "float32" => Ok(Kind::Float32),
            _ => unsupported_error("sample kind"),
        }
    }
}

mod sealed {
    /// A marker trait for indicating 1-byte alignment. This trait is sealed to prevent external
    /// misuse.
    pub trait ByteAligned: bytemuck::Pod {}
}

impl sealed::ByteAligned for [u8; 2] {}
impl sealed::ByteAligned for [u8; 3] {}
impl sealed::ByteAligned for [u8; 4] {}
// Note: DO NOT implement for any types other than [u8; N].

pub use sealed::ByteAligned;

/// The sample trait defines the mandatory operations and attributes an audio sample data type must
/// implement and provide.
///
/// Each implementation holds exactly one value of its [`Kind`]. Conversion rules operate on the
/// sample's lane value: an `i32` for integer kinds (sign-extended from the sample's width) or an
/// `f32` for floating point.
pub trait Sample:
    Copy + Clone + Default + PartialEq + PartialOrd + fmt::Debug + Send + Sync + Sized + 'static
{
    /// The kind of the sample. May be used to dynamically choose how to process the sample at
    /// runtime.
    const KIND: Kind;

    /// The smallest representable sample.
    const MIN: Self;

    /// The largest representable sample.
    const MAX: Self;

    /// The scale between the sample's value and the normalized floating point range: the magnitude
    /// of the integer minimum, or 1.0 for floating point.
    const MULTIPLIER: f32;

    /// The reciprocal of [`Sample::MULTIPLIER`].
    const DIVISOR: f32;

    /// The lane value type used to process the sample in a batch.
    type Lane: LaneValue;

    /// The unsigned integer type holding the sample's bit pattern.
    type Word: WireWord;

    /// The data type that stores the packed byte representation of the sample.
    ///
    /// The `sealed::ByteAligned` trait bound constrains the allowable types this may be. Only byte
    /// array types are allowed.
    type RawType: ByteAligned;

    /// Widen the sample to its lane value.
    fn to_lane(self) -> Self::Lane;

    /// Narrow a lane value to a sample. Integer lanes are truncated to the width of the sample.
    fn from_lane(lane: Self::Lane) -> Self;

    /// Reinterpret the sample's bit pattern as an unsigned word.
    fn to_word(self) -> Self::Word;

    /// Reinterpret an unsigned word as a sample.
    fn from_word(word: Self::Word) -> Self;

    /// Reinterpret the lanes of a batch as unsigned words. Bits above the sample's width are
    /// cleared.
    fn lanes_to_words(lanes: Batch<Self::Lane>) -> Batch<u32>;

    /// Reinterpret unsigned words as lane values. Integer words narrower than 32 bits are
    /// sign-extended from their top bit.
    fn lanes_from_words(words: Batch<u32>) -> Batch<Self::Lane>;

    /// Return the sample in its packed in-memory byte representation.
    fn to_ne_sample_bytes(self) -> Self::RawType;

    /// Read a sample from its packed in-memory byte representation.
    fn from_ne_sample_bytes(bytes: Self::RawType) -> Self;
}

/// An integer sample.
pub trait IntSample: Sample<Lane = i32> {
    /// The smallest representable sample as a lane value.
    const MIN_LANE: i32;
    /// The largest representable sample as a lane value.
    const MAX_LANE: i32;
}

/// A signed 24-bit integer sample stored as 3 bytes in little-endian order.
///
/// No native integer type has a width of 24 bits. The value is therefore sign-extended from its
/// top byte whenever it is read, and arithmetic is performed by promoting to `i32`, operating, and
/// truncating back to 24 bits. All arithmetic wraps.
#[allow(non_camel_case_types)]
#[repr(transparent)]
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct i24(pub [u8; 3]);

/// An unsigned 24-bit integer stored as 3 bytes in little-endian order.
///
/// Used as the storage word of the 24-bit wire format.
#[allow(non_camel_case_types)]
#[repr(transparent)]
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct u24(pub [u8; 3]);

// Implementation for i24

impl i24 {
    /// The largest value that can be represented by this integer type.
    pub const MAX: i24 = i24([0xff, 0xff, 0x7f]);
    /// The smallest value that can be represented by this integer type.
    pub const MIN: i24 = i24([0x00, 0x00, 0x80]);

    /// Create an `i24` from the lower 24 bits of an `i32`. The upper bits are discarded.
    #[inline(always)]
    pub const fn from_i32(val: i32) -> Self {
        let b = val.to_le_bytes();
        i24([b[0], b[1], b[2]])
    }

    /// Get the value of this `i24` sign-extended to an `i32`.
    #[inline(always)]
    pub fn inner(self) -> i32 {
        let [b0, b1, b2] = self.0;
        sign_extend_leq32_to_i32(u32::from_le_bytes([b0, b1, b2, 0]), 24)
    }

    /// Return the memory representation of this `i24` as a byte array in little-endian order.
    #[inline(always)]
    pub fn to_le_bytes(self) -> [u8; 3] {
        self.0
    }

    /// Return the memory representation of this `i24` as a byte array in big-endian order.
    #[inline(always)]
    pub fn to_be_bytes(self) -> [u8; 3] {
        let [b0, b1, b2] = self.0;
        [b2, b1, b0]
    }
}

impl fmt::Debug for i24 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i24({})", self.inner())
    }
}

impl fmt::Display for i24 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner())
    }
}

impl PartialOrd for i24 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for i24 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner().cmp(&other.inner())
    }
}

impl From<i16> for i24 {
    fn from(val: i16) -> Self {
        i24::from_i32(i32::from(val))
    }
}

impl From<i8> for i24 {
    fn from(val: i8) -> Self {
        i24::from_i32(i32::from(val))
    }
}

impl From<i24> for i32 {
    fn from(val: i24) -> Self {
        val.inner()
    }
}

macro_rules! i24_binop_impl {
    ($trait:ident, $func:ident, $op:ident) => {
        impl core::ops::$trait<i24> for i24 {
            type Output = i24;

            #[inline]
            fn $func(self, other: Self) -> Self {
                i24::from_i32(self.inner().$op(other.inner()))
            }
        }
    };
}

i24_binop_impl!(Add, add, wrapping_add);
i24_binop_impl!(Sub, sub, wrapping_sub);
i24_binop_impl!(Mul, mul, wrapping_mul);

macro_rules! i24_bitop_impl {
    ($trait:ident, $func:ident, $op:tt) => {
        impl core::ops::$trait<i24> for i24 {
            type Output = i24;

            #[inline]
            fn $func(self, other: Self) -> Self {
                i24::from_i32(self.inner() $op other.inner())
            }
        }
    };
}

i24_bitop_impl!(BitAnd, bitand, &);
i24_bitop_impl!(BitOr, bitor, |);
i24_bitop_impl!(BitXor, bitxor, ^);

impl core::ops::Neg for i24 {
    type Output = i24;

    #[inline]
    fn neg(self) -> Self {
        i24::from_i32(self.inner().wrapping_neg())
    }
}

impl core::ops::Not for i24 {
    type Output = i24;

    #[inline]
    fn not(self) -> Self {
        i24::from_i32(!self.inner())
    }
}

impl core::ops::Shl<u32> for i24 {
    type Output = i24;

    #[inline]
    fn shl(self, shift: u32) -> Self {
        i24::from_i32(self.inner().wrapping_shl(shift))
    }
}

impl core::ops::Shr<u32> for i24 {
    type Output = i24;

    #[inline]
    fn shr(self, shift: u32) -> Self {
        i24::from_i32(self.inner().wrapping_shr(shift))
    }
}

// Implementation for u24

impl u24 {
    /// The largest value that can be represented by this integer type.
    pub const MAX: u24 = u24([0xff, 0xff, 0xff]);
    /// The smallest value that can be represented by this integer type.
    pub const MIN: u24 = u24([0x00, 0x00, 0x00]);

    /// Create a `u24` from the lower 24 bits of a `u32`. The upper bits are discarded.
    #[inline(always)]
    pub const fn from_u32(val: u32) -> Self {
        let b = val.to_le_bytes();
        u24([b[0], b[1], b[2]])
    }

    /// Get the value of this `u24` zero-extended to a `u32`.
    #[inline(always)]
    pub fn inner(self) -> u32 {
        let [b0, b1, b2] = self.0;
        u32::from_le_bytes([b0, b1, b2, 0])
    }
}

impl fmt::Debug for u24 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u24({:#08x})", self.inner())
    }
}

impl fmt::Display for u24 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner())
    }
}

impl ByteSwap for u24 {
    #[inline(always)]
    fn reverse_bytes(self) -> Self {
        let [b0, b1, b2] = self.0;
        u24([b2, b1, b0])
    }
}

// Sample implementations

impl Sample for i16 {
    const KIND: Kind = Kind::Int16;
    const MIN: i16 = i16::MIN;
    const MAX: i16 = i16::MAX;
    const MULTIPLIER: f32 = 32_768.0;
    const DIVISOR: f32 = 1.0 / 32_768.0;

    type Lane = i32;
    type Word = u16;
    type RawType = [u8; 2];

    #[inline(always)]
    fn to_lane(self) -> i32 {
        i32::from(self)
    }

    #[inline(always)]
    fn from_lane(lane: i32) -> Self {
        lane as i16
    }

    #[inline(always)]
    fn to_word(self) -> u16 {
        self as u16
    }

    #[inline(always)]
    fn from_word(word: u16) -> Self {
        word as i16
    }

    #[inline(always)]
    fn lanes_to_words(lanes: Batch<i32>) -> Batch<u32> {
        lanes.as_u32() & Batch::splat(mask_lower_u32(Self::KIND.bits()))
    }

    #[inline(always)]
    fn lanes_from_words(words: Batch<u32>) -> Batch<i32> {
        (words << 16).as_i32() >> 16
    }

    #[inline(always)]
    fn to_ne_sample_bytes(self) -> [u8; 2] {
        self.to_ne_bytes()
    }

    #[inline(always)]
    fn from_ne_sample_bytes(bytes: [u8; 2]) -> Self {
        i16::from_ne_bytes(bytes)
    }
}

impl IntSample for i16 {
    const MIN_LANE: i32 = i16::MIN as i32;
    const MAX_LANE: i32 = i16::MAX as i32;
}

impl Sample for i24 {
    const KIND: Kind = Kind::Int24;
    const MIN: i24 = i24::MIN;
    const MAX: i24 = i24::MAX;
    const MULTIPLIER: f32 = 8_388_608.0;
    const DIVISOR: f32 = 1.0 / 8_388_608.0;

    type Lane = i32;
    type Word = u24;
    type RawType = [u8; 3];

    #[inline(always)]
    fn to_lane(self) -> i32 {
        self.inner()
    }

    #[inline(always)]
    fn from_lane(lane: i32) -> Self {
        i24::from_i32(lane)
    }

    #[inline(always)]
    fn to_word(self) -> u24 {
        u24(self.0)
    }

    #[inline(always)]
    fn from_word(word: u24) -> Self {
        i24(word.0)
    }

    #[inline(always)]
    fn lanes_to_words(lanes: Batch<i32>) -> Batch<u32> {
        lanes.as_u32() & Batch::splat(mask_lower_u32(Self::KIND.bits()))
    }

    #[inline(always)]
    fn lanes_from_words(words: Batch<u32>) -> Batch<i32> {
        (words << 8).as_i32() >> 8
    }

    #[inline(always)]
    fn to_ne_sample_bytes(self) -> [u8; 3] {
        self.0
    }

    #[inline(always)]
    fn from_ne_sample_bytes(bytes: [u8; 3]) -> Self {
        i24(bytes)
    }
}

impl IntSample for i24 {
    const MIN_LANE: i32 = -8_388_608;
    const MAX_LANE: i32 = 8_388_607;
}

impl Sample for i32 {
    const KIND: Kind = Kind::Int32;
    const MIN: i32 = i32::MIN;
    const MAX: i32 = i32::MAX;
    const MULTIPLIER: f32 = 2_147_483_648.0;
    const DIVISOR: f32 = 1.0 / 2_147_483_648.0;

    type Lane = i32;
    type Word = u32;
    type RawType = [u8; 4];

    #[inline(always)]
    fn to_lane(self) -> i32 {
        self
    }

    #[inline(always)]
    fn from_lane(lane: i32) -> Self {
        lane
    }

    #[inline(always)]
    fn to_word(self) -> u32 {
        self as u32
    }

    #[inline(always)]
    fn from_word(word: u32) -> Self {
        word as i32
    }

    #[inline(always)]
    fn lanes_to_words(lanes: Batch<i32>) -> Batch<u32> {
        lanes.as_u32()
    }

    #[inline(always)]
    fn lanes_from_words(words: Batch<u32>) -> Batch<i32> {
        words.as_i32()
    }

    #[inline(always)]
    fn to_ne_sample_bytes(self) -> [u8; 4] {
        self.to_ne_bytes()
    }

    #[inline(always)]
    fn from_ne_sample_bytes(bytes: [u8; 4]) -> Self {
        i32::from_ne_bytes(bytes)
    }
}

impl IntSample for i32 {
    const MIN_LANE: i32 = i32::MIN;
    const MAX_LANE: i32 = i32::MAX;
}

impl Sample for f32 {
    const KIND: Kind = Kind::Float32;
    const MIN: f32 = -1.0;
    const MAX: f32 = 1.0;
    const MULTIPLIER: f32 = 1.0;
    const DIVISOR: f32 = 1.0;

    type Lane = f32;
    type Word = u32;
    type RawType = [u8; 4];

    #[inline(always)]
    fn to_lane(self) -> f32 {
        self
    }

    #[inline(always)]
    fn from_lane(lane: f32) -> Self {
        lane
    }

    #[inline(always)]
    fn to_word(self) -> u32 {
        self.to_bits()
    }

    #[inline(always)]
    fn from_word(word: u32) -> Self {
        f32::from_bits(word)
    }

    #[inline(always)]
    fn lanes_to_words(lanes: Batch<f32>) -> Batch<u32> {
        lanes.to_bits()
    }

    #[inline(always)]
    fn lanes_from_words(words: Batch<u32>) -> Batch<f32> {
        words.as_f32_bits()
    }

    #[inline(always)]
    fn to_ne_sample_bytes(self) -> [u8; 4] {
        self.to_ne_bytes()
    }

    #[inline(always)]
    fn from_ne_sample_bytes(bytes: [u8; 4]) -> Self {
        f32::from_ne_bytes(bytes)
    }
}

// Resonant
// Copyright (c) 2024 The Project Resonant Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `endian` module implements the big-endian wire format.
//!
//! A [`WireSample`] holds the bit pattern of a sample stored in big-endian byte order regardless
//! of the host's byte order. It is the only sample representation that may be persisted or
//! transmitted. A wire sample is opaque: it may only be compared for bit equality, or converted to
//! and from a sample or raw bytes.

use core::fmt;
use core::hash::Hash;
use core::marker::PhantomData;

use crate::batch::Batch;
use crate::sample::{u24, ByteAligned, Sample};

/// Full byte order reversal.
pub trait ByteSwap: Sized {
    /// Reverse the order of the bytes.
    fn reverse_bytes(self) -> Self;
}

impl ByteSwap for u16 {
    #[inline(always)]
    fn reverse_bytes(self) -> Self {
        self.swap_bytes()
    }
}

impl ByteSwap for u32 {
    #[inline(always)]
    fn reverse_bytes(self) -> Self {
        self.swap_bytes()
    }
}

/// An unsigned word that stores a sample's bit pattern, in either host or wire byte order.
pub trait WireWord:
    ByteSwap + Copy + Default + PartialEq + Eq + Hash + fmt::Debug + Send + Sync + 'static
{
    /// True if the word's in-memory byte order differs from big-endian, so that converting between
    /// host and wire order requires a byte reversal.
    const SWAP: bool;

    /// The in-memory byte representation of the word.
    type Bytes: ByteAligned;

    /// Convert a word from host order to wire order.
    #[inline(always)]
    fn host_to_wire(self) -> Self {
        if Self::SWAP {
            self.reverse_bytes()
        }
        else {
            self
        }
    }

    /// Convert a word from wire order to host order.
    #[inline(always)]
    fn wire_to_host(self) -> Self {
        // Byte reversal is an involution.
        self.host_to_wire()
    }

    /// Zero-extend the word into a 32-bit lane.
    fn to_lane(self) -> u32;

    /// Truncate a 32-bit lane to a word.
    fn from_lane(lane: u32) -> Self;

    /// Lane-wise [`ByteSwap::reverse_bytes`] of zero-extended words.
    fn reverse_lanes(words: Batch<u32>) -> Batch<u32>;

    /// Lane-wise [`WireWord::host_to_wire`].
    #[inline(always)]
    fn host_to_wire_lanes(words: Batch<u32>) -> Batch<u32> {
        if Self::SWAP {
            Self::reverse_lanes(words)
        }
        else {
            words
        }
    }

    /// Lane-wise [`WireWord::wire_to_host`].
    #[inline(always)]
    fn wire_to_host_lanes(words: Batch<u32>) -> Batch<u32> {
        Self::host_to_wire_lanes(words)
    }

    /// The in-memory bytes of the word.
    fn to_mem_bytes(self) -> Self::Bytes;

    /// Read a word from its in-memory bytes.
    fn from_mem_bytes(bytes: Self::Bytes) -> Self;
}

impl WireWord for u16 {
    const SWAP: bool = cfg!(target_endian = "little");

    type Bytes = [u8; 2];

    #[inline(always)]
    fn to_lane(self) -> u32 {
        u32::from(self)
    }

    #[inline(always)]
    fn from_lane(lane: u32) -> Self {
        lane as u16
    }

    #[inline(always)]
    fn reverse_lanes(words: Batch<u32>) -> Batch<u32> {
        ((words & Batch::splat(0xff)) << 8) | ((words >> 8) & Batch::splat(0xff))
    }

    #[inline(always)]
    fn to_mem_bytes(self) -> [u8; 2] {
        self.to_ne_bytes()
    }

    #[inline(always)]
    fn from_mem_bytes(bytes: [u8; 2]) -> Self {
        u16::from_ne_bytes(bytes)
    }
}

// A u24 is stored in little-endian order on every host, so it is always reversed to reach the
// big-endian wire order.
impl WireWord for u24 {
    const SWAP: bool = true;

    type Bytes = [u8; 3];

    #[inline(always)]
    fn to_lane(self) -> u32 {
        self.inner()
    }

    #[inline(always)]
    fn from_lane(lane: u32) -> Self {
        u24::from_u32(lane)
    }

    #[inline(always)]
    fn reverse_lanes(words: Batch<u32>) -> Batch<u32> {
        ((words & Batch::splat(0xff_0000)) >> 16)
            | (words & Batch::splat(0xff00))
            | ((words & Batch::splat(0xff)) << 16)
    }

    #[inline(always)]
    fn to_mem_bytes(self) -> [u8; 3] {
        self.0
    }

    #[inline(always)]
    fn from_mem_bytes(bytes: [u8; 3]) -> Self {
        u24(bytes)
    }
}

impl WireWord for u32 {
    const SWAP: bool = cfg!(target_endian = "little");

    type Bytes = [u8; 4];

    #[inline(always)]
    fn to_lane(self) -> u32 {
        self
    }

    #[inline(always)]
    fn from_lane(lane: u32) -> Self {
        lane
    }

    #[inline(always)]
    fn reverse_lanes(words: Batch<u32>) -> Batch<u32> {
        (words << 24)
            | ((words & Batch::splat(0xff00)) << 8)
            | ((words >> 8) & Batch::splat(0xff00))
            | (words >> 24)
    }

    #[inline(always)]
    fn to_mem_bytes(self) -> [u8; 4] {
        self.to_ne_bytes()
    }

    #[inline(always)]
    fn from_mem_bytes(bytes: [u8; 4]) -> Self {
        u32::from_ne_bytes(bytes)
    }
}

/// Convert a host order word to wire order.
#[inline(always)]
pub fn host_to_wire<W: WireWord>(word: W) -> W {
    word.host_to_wire()
}

/// Convert a wire order word to host order.
#[inline(always)]
pub fn wire_to_host<W: WireWord>(word: W) -> W {
    word.wire_to_host()
}

/// The big-endian wire representation of a sample of type `S`.
///
/// A wire sample has the same width as its sample, and the same in-memory layout on every host.
#[repr(transparent)]
pub struct WireSample<S: Sample> {
    word: S::Word,
    sample: PhantomData<S>,
}

impl<S: Sample> WireSample<S> {
    /// Create a wire sample from a word that is already in wire order.
    #[inline(always)]
    pub fn from_bits(word: S::Word) -> Self {
        WireSample { word, sample: PhantomData }
    }

    /// Get the word of the wire sample in wire order.
    #[inline(always)]
    pub fn to_bits(self) -> S::Word {
        self.word
    }

    /// Get the in-memory bytes of the wire sample. The bytes are in big-endian order.
    #[inline(always)]
    pub fn to_bytes(self) -> <S::Word as WireWord>::Bytes {
        self.word.to_mem_bytes()
    }

    /// Create a wire sample from big-endian bytes.
    #[inline(always)]
    pub fn from_bytes(bytes: <S::Word as WireWord>::Bytes) -> Self {
        WireSample::from_bits(S::Word::from_mem_bytes(bytes))
    }
}

// Manual implementations avoid placing bounds on `S` beyond `Sample`.

impl<S: Sample> Clone for WireSample<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Sample> Copy for WireSample<S> {}

impl<S: Sample> Default for WireSample<S> {
    fn default() -> Self {
        WireSample::from_bits(S::Word::default())
    }
}

impl<S: Sample> PartialEq for WireSample<S> {
    fn eq(&self, other: &Self) -> bool {
        self.word == other.word
    }
}

impl<S: Sample> Eq for WireSample<S> {}

impl<S: Sample> Hash for WireSample<S> {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.word.hash(state);
    }
}

impl<S: Sample> fmt::Debug for WireSample<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WireSample<{}>({:?})", S::KIND, self.word)
    }
}

/// Convert a sample to its wire representation.
#[inline(always)]
pub fn sample_to_wire<S: Sample>(sample: S) -> WireSample<S> {
    WireSample::from_bits(host_to_wire(sample.to_word()))
}

/// Convert a wire sample to a sample.
#[inline(always)]
pub fn wire_to_sample<S: Sample>(wire: WireSample<S>) -> S {
    S::from_word(wire_to_host(wire.to_bits()))
}

/// Lane-wise [`sample_to_wire`]. Produces zero-extended wire words.
#[inline(always)]
pub fn sample_to_wire_batch<S: Sample>(lanes: Batch<S::Lane>) -> Batch<u32> {
    S::Word::host_to_wire_lanes(S::lanes_to_words(lanes))
}

/// Lane-wise [`wire_to_sample`] of zero-extended wire words.
///
/// A word narrower than 32 bits loses its sign when carried in a 32-bit lane, so after the byte
/// reversal the lane is re-sign-extended from the top bit of the word.
#[inline(always)]
pub fn wire_to_sample_batch<S: Sample>(words: Batch<u32>) -> Batch<S::Lane> {
    S::lanes_from_words(S::Word::wire_to_host_lanes(words))
}

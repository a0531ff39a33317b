// Resonant
// Copyright (c) 2024 The Project Resonant Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `round` module provides the rounding primitives used by the conversion rules.
//!
//! Integer narrowing rounds with [`round_half_away_from_zero`] before shifting. Floating point to
//! integer conversion rounds to the nearest integer with one of two interchangeable strategies:
//!
//! * [`round_f32_to_i32`] uses the native round-to-nearest-even instruction.
//! * [`round_f32_to_i32_magic`] adds a magic constant in double precision so that the integer part
//!   lands in the low mantissa bits, then extracts those bits.
//!
//! The two agree on every input except exact ties, which the scaled and dithered inputs of the
//! conversion rules do not produce in practice.

use crate::batch::Batch;
use crate::util::bits::sign_mask_i32;

/// 2^52 + 2^51. Adding this to a double whose magnitude is below 2^51 aligns the units digit with
/// the least significant mantissa bit.
pub const MAGIC: f64 = 6_755_399_441_055_744.0;

/// Bias added before the magic constant to counter double rounding at exact halves.
pub const MAGIC_DELTA: f64 = 1.5e-8;

/// Add a rounding constant to `value` such that a subsequent arithmetic right shift rounds to
/// nearest, with ties rounded away from zero.
///
/// An arithmetic right shift of a negative value replicates the sign bit, so `value >> 31` is `-1`
/// for negative values and `0` otherwise. Adding it to the rounding constant lowers the bias for
/// negative values by one, which turns round-half-up into round-half-away-from-zero.
#[inline(always)]
pub fn round_half_away_from_zero(value: i32, rounding: i32) -> i32 {
    value.wrapping_add(rounding.wrapping_add(sign_mask_i32(value)))
}

/// Lane-wise [`round_half_away_from_zero`].
#[inline(always)]
pub fn round_half_away_from_zero_batch(value: Batch<i32>, rounding: i32) -> Batch<i32> {
    value + (Batch::splat(rounding) + (value >> 31))
}

/// Round to the nearest integer, with ties rounded to even, using the native rounding instruction.
///
/// Out-of-range inputs saturate to `i32::MIN` or `i32::MAX`, and NaN converts to 0.
#[inline(always)]
pub fn round_f32_to_i32(x: f32) -> i32 {
    x.round_ties_even() as i32
}

/// Round to the nearest integer using the double precision magic number method.
///
/// The result for inputs whose magnitude reaches 2^31 wraps.
#[inline(always)]
pub fn round_f32_to_i32_magic(x: f32) -> i32 {
    ((f64::from(x) + MAGIC_DELTA) + MAGIC).to_bits() as u32 as i32
}

/// Round to the nearest integer using the fastest method available on the target.
///
/// x86 with SSE, x86-64, and AArch64 have a native round-to-nearest-even conversion, so this is
/// [`round_f32_to_i32`]. Other targets use [`round_f32_to_i32_magic`].
#[inline(always)]
pub fn round_f32_to_i32_fast(x: f32) -> i32 {
    #[cfg(any(
        target_arch = "x86_64",
        all(target_arch = "x86", target_feature = "sse"),
        target_arch = "aarch64"
    ))]
    {
        round_f32_to_i32(x)
    }

    #[cfg(not(any(
        target_arch = "x86_64",
        all(target_arch = "x86", target_feature = "sse"),
        target_arch = "aarch64"
    )))]
    {
        round_f32_to_i32_magic(x)
    }
}

/// Lane-wise [`round_f32_to_i32`].
#[inline(always)]
pub fn round_f32_to_i32_batch(x: Batch<f32>) -> Batch<i32> {
    x.round_ties_even_to_i32()
}

/// Lane-wise [`round_f32_to_i32_fast`].
#[inline(always)]
pub fn round_f32_to_i32_fast_batch(x: Batch<f32>) -> Batch<i32> {
    #[cfg(any(
        target_arch = "x86_64",
        all(target_arch = "x86", target_feature = "sse"),
        target_arch = "aarch64"
    ))]
    {
        x.round_ties_even_to_i32()
    }

    // The magic number method needs double precision, which has no lane-parallel form here.
    #[cfg(not(any(
        target_arch = "x86_64",
        all(target_arch = "x86", target_feature = "sse"),
        target_arch = "aarch64"
    )))]
    {
        x.map(round_f32_to_i32_magic)
    }
}

// Resonant
// Copyright (c) 2024 The Project Resonant Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fast policy conversion rules.
//!
//! The fast rules apply the same shifts, scales and dither as the reference rules, but do not add
//! a rounding bias and do not saturate. Inputs that the reference rules would saturate produce
//! unspecified (but memory safe) results.

use crate::batch::Batch;
use crate::dither::Dither;
use crate::round::{round_f32_to_i32_fast, round_f32_to_i32_fast_batch};
use crate::sample::IntSample;

use super::reference::{float_scaler, i24_pre_dither_shift, i32_pre_dither_shift};

const I24_TO_I16_SHIFT: u32 = 8;
const I32_TO_I16_SHIFT: u32 = 16;
const I32_TO_I24_SHIFT: u32 = 8;

#[inline(always)]
pub(super) fn i24_to_i16<D: Dither>(sample: i32, dither: &mut D) -> i32 {
    let pre = i24_pre_dither_shift::<D>();
    let post = I24_TO_I16_SHIFT + pre;

    sample.wrapping_shl(pre).wrapping_add(dither.generate_int()) >> post
}

#[inline(always)]
pub(super) fn i24_to_i16_batch<D: Dither>(sample: Batch<i32>, dither: &mut D) -> Batch<i32> {
    let pre = i24_pre_dither_shift::<D>();
    let post = I24_TO_I16_SHIFT + pre;

    ((sample << pre) + dither.generate_batch_int()) >> post
}

#[inline(always)]
pub(super) fn i32_to_i16<D: Dither>(sample: i32, dither: &mut D) -> i32 {
    let pre = i32_pre_dither_shift::<D>();
    let post = I32_TO_I16_SHIFT - pre;

    (sample >> pre).wrapping_add(dither.generate_int()) >> post
}

#[inline(always)]
pub(super) fn i32_to_i16_batch<D: Dither>(sample: Batch<i32>, dither: &mut D) -> Batch<i32> {
    let pre = i32_pre_dither_shift::<D>();
    let post = I32_TO_I16_SHIFT - pre;

    ((sample >> pre) + dither.generate_batch_int()) >> post
}

#[inline(always)]
pub(super) fn i32_to_i24<D: Dither>(sample: i32, _: &mut D) -> i32 {
    sample >> I32_TO_I24_SHIFT
}

#[inline(always)]
pub(super) fn i32_to_i24_batch<D: Dither>(sample: Batch<i32>, _: &mut D) -> Batch<i32> {
    sample >> I32_TO_I24_SHIFT
}

#[inline(always)]
pub(super) fn f32_to_int<T: IntSample, D: Dither>(sample: f32, dither: &mut D) -> i32 {
    round_f32_to_i32_fast((sample * float_scaler::<T, D>()) + dither.generate_float())
}

#[inline(always)]
pub(super) fn f32_to_int_batch<T: IntSample, D: Dither>(
    sample: Batch<f32>,
    dither: &mut D,
) -> Batch<i32> {
    let scaled = (sample * Batch::splat(float_scaler::<T, D>())) + dither.generate_batch_float();
    round_f32_to_i32_fast_batch(scaled)
}

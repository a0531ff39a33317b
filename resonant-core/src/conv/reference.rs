// Resonant
// Copyright (c) 2024 The Project Resonant Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reference policy conversion rules.
//!
//! Narrowing rounds to nearest with ties away from zero, and saturates inputs that would round
//! past the largest output value. Floating point inputs outside `[-1.0, MAX]` saturate to the
//! output's minimum or maximum.
//!
//! Each rule draws its dither before testing for saturation, so that every input consumes exactly
//! one draw regardless of its value.

use crate::batch::Batch;
use crate::dither::Dither;
use crate::round::{
    round_f32_to_i32, round_f32_to_i32_batch, round_half_away_from_zero,
    round_half_away_from_zero_batch,
};
use crate::sample::{i24, IntSample};

mod i24_to_i16 {
    pub const MAX_IN: i32 = 0x007f_ff80;
    pub const ROUNDING: i32 = 0x80;
    pub const TOTAL_SHIFT: u32 = 8;
}

mod i32_to_i16 {
    pub const MAX_IN: i32 = 0x7fff_8000;
    pub const ROUNDING: i32 = 0x8000;
    pub const TOTAL_SHIFT: u32 = 16;
}

mod i32_to_i24 {
    pub const MAX_IN: i32 = 0x7fff_ff80;
    pub const ROUNDING: i32 = 0x80;
    pub const SHIFT: u32 = 8;
}

/// The headroom left for dither before the final shift when narrowing from 24 bits.
#[inline(always)]
pub(super) fn i24_pre_dither_shift<D: Dither>() -> u32 {
    D::INT_BITS.saturating_sub(i24_to_i16::TOTAL_SHIFT)
}

/// The shift applied before adding dither when narrowing from 32 bits.
#[inline(always)]
pub(super) fn i32_pre_dither_shift<D: Dither>() -> u32 {
    i32_to_i16::TOTAL_SHIFT.saturating_sub(D::INT_BITS)
}

#[inline(always)]
pub(super) fn i24_to_i16<D: Dither>(sample: i32, dither: &mut D) -> i32 {
    let pre = i24_pre_dither_shift::<D>();
    let post = i24_to_i16::TOTAL_SHIFT + pre;

    let dither = dither.generate_int();

    if sample >= i24_to_i16::MAX_IN {
        return <i16 as IntSample>::MAX_LANE;
    }

    let rounded = round_half_away_from_zero(sample, i24_to_i16::ROUNDING);
    rounded.wrapping_shl(pre).wrapping_add(dither) >> post
}

#[inline(always)]
pub(super) fn i24_to_i16_batch<D: Dither>(sample: Batch<i32>, dither: &mut D) -> Batch<i32> {
    let pre = i24_pre_dither_shift::<D>();
    let post = i24_to_i16::TOTAL_SHIFT + pre;

    let dither = dither.generate_batch_int();

    let saturated = sample.simd_ge(Batch::splat(i24_to_i16::MAX_IN));
    let rounded = round_half_away_from_zero_batch(sample, i24_to_i16::ROUNDING);
    let narrowed = ((rounded << pre) + dither) >> post;

    saturated.select(Batch::splat(<i16 as IntSample>::MAX_LANE), narrowed)
}

#[inline(always)]
pub(super) fn i32_to_i16<D: Dither>(sample: i32, dither: &mut D) -> i32 {
    let pre = i32_pre_dither_shift::<D>();
    let post = i32_to_i16::TOTAL_SHIFT - pre;

    let dither = dither.generate_int();

    if sample >= i32_to_i16::MAX_IN {
        return <i16 as IntSample>::MAX_LANE;
    }

    let rounded = round_half_away_from_zero(sample, i32_to_i16::ROUNDING);
    (rounded >> pre).wrapping_add(dither) >> post
}

#[inline(always)]
pub(super) fn i32_to_i16_batch<D: Dither>(sample: Batch<i32>, dither: &mut D) -> Batch<i32> {
    let pre = i32_pre_dither_shift::<D>();
    let post = i32_to_i16::TOTAL_SHIFT - pre;

    let dither = dither.generate_batch_int();

    let saturated = sample.simd_ge(Batch::splat(i32_to_i16::MAX_IN));
    let rounded = round_half_away_from_zero_batch(sample, i32_to_i16::ROUNDING);
    let narrowed = ((rounded >> pre) + dither) >> post;

    saturated.select(Batch::splat(<i16 as IntSample>::MAX_LANE), narrowed)
}

#[inline(always)]
pub(super) fn i32_to_i24<D: Dither>(sample: i32, _: &mut D) -> i32 {
    if sample >= i32_to_i24::MAX_IN {
        return i24::MAX.inner();
    }

    round_half_away_from_zero(sample, i32_to_i24::ROUNDING) >> i32_to_i24::SHIFT
}

#[inline(always)]
pub(super) fn i32_to_i24_batch<D: Dither>(sample: Batch<i32>, _: &mut D) -> Batch<i32> {
    let saturated = sample.simd_ge(Batch::splat(i32_to_i24::MAX_IN));
    let rounded = round_half_away_from_zero_batch(sample, i32_to_i24::ROUNDING);

    saturated.select(Batch::splat(<i24 as IntSample>::MAX_LANE), rounded >> i32_to_i24::SHIFT)
}

/// The smallest floating point input that saturates to the output's maximum.
#[inline(always)]
fn max_in<T: IntSample>() -> f32 {
    T::MAX_LANE as f32 * T::DIVISOR
}

/// Floating point inputs below this value saturate to the output's minimum.
#[inline(always)]
fn min_in<T: IntSample>() -> f32 {
    T::MIN_LANE as f32 * T::DIVISOR
}

/// The scale applied to a floating point input, leaving headroom for the dither's peak magnitude.
#[inline(always)]
pub(super) fn float_scaler<T: IntSample, D: Dither>() -> f32 {
    T::MULTIPLIER - D::MAX_FLOAT
}

#[inline(always)]
pub(super) fn f32_to_int<T: IntSample, D: Dither>(sample: f32, dither: &mut D) -> i32 {
    let dither = dither.generate_float();

    if sample >= max_in::<T>() {
        return T::MAX_LANE;
    }
    if sample < min_in::<T>() {
        return T::MIN_LANE;
    }

    round_f32_to_i32((sample * float_scaler::<T, D>()) + dither)
}

#[inline(always)]
pub(super) fn f32_to_int_batch<T: IntSample, D: Dither>(
    sample: Batch<f32>,
    dither: &mut D,
) -> Batch<i32> {
    let dither = dither.generate_batch_float();

    let above = sample.simd_ge(Batch::splat(max_in::<T>()));
    let below = sample.simd_lt(Batch::splat(min_in::<T>()));

    let scaled = (sample * Batch::splat(float_scaler::<T, D>())) + dither;
    let rounded = round_f32_to_i32_batch(scaled);

    above.select(Batch::splat(T::MAX_LANE), below.select(Batch::splat(T::MIN_LANE), rounded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::LANES;
    use crate::dither::{NullDither, TriangularDither};

    #[test]
    fn verify_i24_to_i16_rounding() {
        let mut d = NullDither;

        assert_eq!(i24_to_i16(0x12_3456, &mut d), 0x1234);
        assert_eq!(i24_to_i16(0x12_3480, &mut d), 0x1235);
        assert_eq!(i24_to_i16(0x12_347f, &mut d), 0x1234);
        assert_eq!(i24_to_i16(-0x12_3480, &mut d), -0x1235);
        assert_eq!(i24_to_i16(-0x12_347f, &mut d), -0x1234);
        assert_eq!(i24_to_i16(0x7f_ff7f, &mut d), 0x7fff);
        assert_eq!(i24_to_i16(0x7f_ff80, &mut d), 0x7fff);
        assert_eq!(i24_to_i16(0x7f_ffff, &mut d), 0x7fff);
        assert_eq!(i24_to_i16(-0x80_0000, &mut d), -0x8000);
    }

    #[test]
    fn verify_i32_to_i16_rounding() {
        let mut d = NullDither;

        assert_eq!(i32_to_i16(0x1234_5678, &mut d), 0x1234);
        assert_eq!(i32_to_i16(0x1234_8000, &mut d), 0x1235);
        assert_eq!(i32_to_i16(-0x1234_8000, &mut d), -0x1235);
        assert_eq!(i32_to_i16(0x7fff_8000, &mut d), 0x7fff);
        assert_eq!(i32_to_i16(i32::MAX, &mut d), 0x7fff);
        assert_eq!(i32_to_i16(i32::MIN, &mut d), -0x8000);
    }

    #[test]
    fn verify_i32_to_i24_rounding() {
        let mut d = NullDither;

        assert_eq!(i32_to_i24(0x1234_5678, &mut d), 0x12_3456);
        assert_eq!(i32_to_i24(0x1234_5680, &mut d), 0x12_3457);
        assert_eq!(i32_to_i24(-0x1234_5680, &mut d), -0x12_3457);
        assert_eq!(i32_to_i24(i32::MAX, &mut d), 0x7f_ffff);
        assert_eq!(i32_to_i24(i32::MIN, &mut d), -0x80_0000);
    }

    #[test]
    fn verify_f32_saturation() {
        let mut d = NullDither;

        assert_eq!(f32_to_int::<i16, _>(2.0, &mut d), 32767);
        assert_eq!(f32_to_int::<i16, _>(-2.0, &mut d), -32768);
        assert_eq!(f32_to_int::<i16, _>(1.0, &mut d), 32767);
        assert_eq!(f32_to_int::<i16, _>(-1.0, &mut d), -32768);
        assert_eq!(f32_to_int::<i32, _>(1.0, &mut d), i32::MAX);
        assert_eq!(f32_to_int::<i32, _>(-1.5, &mut d), i32::MIN);
        assert_eq!(f32_to_int::<i24, _>(f32::INFINITY, &mut d), 8_388_607);
        assert_eq!(f32_to_int::<i24, _>(f32::NEG_INFINITY, &mut d), -8_388_608);
        assert_eq!(f32_to_int::<i16, _>(0.5, &mut d), 16384);
    }

    #[test]
    fn verify_saturation_consumes_dither() {
        let mut saturating = TriangularDither::new();
        let mut reference = TriangularDither::new();

        i32_to_i16(i32::MAX, &mut saturating);
        f32_to_int::<i16, _>(2.0, &mut saturating);

        reference.generate_int();
        reference.generate_float();

        assert_eq!(saturating.generate_int(), reference.generate_int());
    }

    #[test]
    fn verify_dither_wraps_below_saturation() {
        // Below the saturation threshold the rounded sample plus a draw of at least 0x80 carries
        // past the i16 maximum, and the narrowed sample wraps to the minimum.
        let mut dither = TriangularDither::with_seed(0x5a7_0001);
        let mut wrapped = 0;

        for _ in 0..10_000 {
            let draw = dither.clone().generate_int();
            let narrowed = i24_to_i16(0x7f_ff7f, &mut dither) as i16;

            if draw >= 0x80 {
                assert_eq!(narrowed, i16::MIN, "draw = {}", draw);
                wrapped += 1;
            }
            else {
                assert!(narrowed >= 0x7ffe, "draw = {}", draw);
            }
        }

        assert!(wrapped > 0);

        // The lane-parallel rule wraps identically.
        let mut scalar = TriangularDither::with_seed(0x5a7_0001);
        let mut batch = scalar.clone();

        let lanes = i24_to_i16_batch(Batch::splat(0x7f_ff7f), &mut batch);

        for lane in 0..LANES {
            assert_eq!(lanes.lane(lane) as i16, i24_to_i16(0x7f_ff7f, &mut scalar) as i16);
        }
    }

    #[test]
    fn verify_dithered_stays_near_undithered() {
        let mut d = TriangularDither::new();

        for x in (-0x7f_0000..0x7f_0000).step_by(0x1_0001) {
            let narrowed = i24_to_i16(x, &mut d);
            assert!((narrowed - (x >> 8)).abs() <= 2, "x = {:#x}", x);
        }
    }

    #[test]
    fn verify_batch_rules_match_scalar() {
        let ints = [i32::MIN, -0x1234_8000, -1, 0, 0x7f, 0x80, 0x7fff_8000, i32::MAX];
        let int24s = [-0x80_0000, -0x12_3480, -1, 0, 0x7f, 0x80, 0x7f_ff80, 0x7f_ffff];
        let floats = [-2.0, -1.0, -0.5, 0.0, 0.25, 0.999, 1.0, f32::NAN];

        let int_batch = Batch::from_fn(|i| ints[i % ints.len()]);
        let int24_batch = Batch::from_fn(|i| int24s[i % int24s.len()]);
        let float_batch = Batch::from_fn(|i| floats[i % floats.len()]);

        let mut a = TriangularDither::new();
        let mut b = TriangularDither::new();

        let i16s = i32_to_i16_batch(int_batch, &mut a);
        let i24s = i32_to_i24_batch(int_batch, &mut a);
        let from24 = i24_to_i16_batch(int24_batch, &mut a);
        let fromf = f32_to_int_batch::<i16, _>(float_batch, &mut a);

        for lane in 0..LANES {
            assert_eq!(i16s.lane(lane), i32_to_i16(int_batch.lane(lane), &mut b));
        }
        for lane in 0..LANES {
            assert_eq!(i24s.lane(lane), i32_to_i24(int_batch.lane(lane), &mut b));
        }
        for lane in 0..LANES {
            assert_eq!(from24.lane(lane), i24_to_i16(int24_batch.lane(lane), &mut b));
        }
        for lane in 0..LANES {
            assert_eq!(fromf.lane(lane), f32_to_int::<i16, _>(float_batch.lane(lane), &mut b));
        }
    }
}

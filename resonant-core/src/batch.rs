// Resonant
// Copyright (c) 2024 The Project Resonant Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `batch` module provides a fixed-width group of 32-bit lanes used to execute conversion
//! rules on many samples at once.
//!
//! A [`Batch`] wraps one `wide` vector of [`LANES`] values. The vector width is selected at
//! compile time from the enabled target features so that one batch fills one vector register:
//!
//! * 8 lanes (`i32x8`, `u32x8`, `f32x8`) when `avx2` is enabled,
//! * 4 lanes (`i32x4`, `u32x4`, `f32x4`) otherwise. These map to SSE2 on x86, NEON on AArch64,
//!   and to a portable array implementation elsewhere.
//!
//! Every lane-wise operation is equivalent to the matching scalar operation on `i32`, `u32`, or
//! `f32`. Integer arithmetic wraps. Shift amounts must be less than 32.

use core::fmt;
use core::ops::{Add, BitAnd, BitOr, BitXor, Mul, Shl, Shr, Sub};

use bytemuck::Pod;
use wide::{CmpEq, CmpGe, CmpGt, CmpLt, CmpNe};

#[cfg(target_feature = "avx2")]
mod width {
    /// The number of lanes in a batch.
    pub const LANES: usize = 8;

    pub type I32s = wide::i32x8;
    pub type U32s = wide::u32x8;
    pub type F32s = wide::f32x8;
}

#[cfg(not(target_feature = "avx2"))]
mod width {
    /// The number of lanes in a batch.
    pub const LANES: usize = 4;

    pub type I32s = wide::i32x4;
    pub type U32s = wide::u32x4;
    pub type F32s = wide::f32x4;
}

pub use width::LANES;

use width::{F32s, I32s, U32s};

/// A value that may occupy one lane of a batch.
pub trait LaneValue: Pod + Default + PartialEq + fmt::Debug + Send + Sync {
    /// The vector holding [`LANES`] values of this type.
    type Vector: Pod + Send + Sync;

    /// Create a vector with every lane set to `value`.
    fn splat_vector(value: Self) -> Self::Vector;
}

macro_rules! impl_lane_value {
    ($t:ty, $vector:ty) => {
        impl LaneValue for $t {
            type Vector = $vector;

            #[inline(always)]
            fn splat_vector(value: $t) -> $vector {
                <$vector>::splat(value)
            }
        }
    };
}

impl_lane_value!(i32, I32s);
impl_lane_value!(u32, U32s);
impl_lane_value!(f32, F32s);

/// A lane group in memory aligned to the widest supported vector register.
///
/// Used as the staging area for loads and stores that do not map directly onto a slice of lane
/// values.
#[repr(C, align(32))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aligned<T>(pub [T; LANES]);

impl<T: Copy + Default> Default for Aligned<T> {
    fn default() -> Self {
        Aligned([T::default(); LANES])
    }
}

/// A fixed-width group of values processed in lock-step.
pub struct Batch<T: LaneValue>(T::Vector);

impl<T: LaneValue> Batch<T> {
    /// Create a batch with every lane set to `value`.
    #[inline(always)]
    pub fn splat(value: T) -> Self {
        Batch(T::splat_vector(value))
    }

    /// Create a batch from an array of lanes.
    #[inline(always)]
    pub fn from_array(lanes: [T; LANES]) -> Self {
        Batch(bytemuck::cast(lanes))
    }

    /// Create a batch by calling `f` once for each lane index, in ascending lane order.
    #[inline(always)]
    pub fn from_fn<F: FnMut(usize) -> T>(f: F) -> Self {
        Self::from_array(core::array::from_fn(f))
    }

    /// Load one full batch from the start of `src`.
    ///
    /// Panics if `src` is shorter than [`LANES`].
    #[inline(always)]
    pub fn load(src: &[T]) -> Self {
        let mut lanes = [T::default(); LANES];
        lanes.copy_from_slice(&src[..LANES]);
        Self::from_array(lanes)
    }

    /// Load one full batch from an aligned lane group.
    #[inline(always)]
    pub fn load_aligned(src: &Aligned<T>) -> Self {
        Self::from_array(src.0)
    }

    /// Load fewer than [`LANES`] values from `src`. The unused upper lanes are set to the default
    /// (zero) value.
    #[inline(always)]
    pub fn load_partial(src: &[T]) -> Self {
        debug_assert!(src.len() < LANES);

        let mut staging = Aligned::default();
        staging.0[..src.len()].copy_from_slice(src);
        Self::load_aligned(&staging)
    }

    /// Store the batch to the start of `dst`.
    ///
    /// Panics if `dst` is shorter than [`LANES`].
    #[inline(always)]
    pub fn store(self, dst: &mut [T]) {
        dst[..LANES].copy_from_slice(self.as_array());
    }

    /// Store the batch to an aligned lane group.
    #[inline(always)]
    pub fn store_aligned(self, dst: &mut Aligned<T>) {
        dst.0 = self.to_array();
    }

    /// Store the lower `dst.len()` lanes of the batch to `dst`, where `dst` is shorter than
    /// [`LANES`]. The upper lanes are discarded.
    #[inline(always)]
    pub fn store_partial(self, dst: &mut [T]) {
        debug_assert!(dst.len() < LANES);

        let mut staging = Aligned::default();
        self.store_aligned(&mut staging);
        let n = dst.len();
        dst.copy_from_slice(&staging.0[..n]);
    }

    /// Apply `f` to every lane, one lane at a time. Only for operations with no vector form.
    #[inline(always)]
    pub fn map<U: LaneValue, F: FnMut(T) -> U>(self, f: F) -> Batch<U> {
        Batch::from_array(self.to_array().map(f))
    }

    /// Get the value of one lane.
    #[inline(always)]
    pub fn lane(&self, idx: usize) -> T {
        self.as_array()[idx]
    }

    /// Borrow the lanes as an array.
    #[inline(always)]
    pub fn as_array(&self) -> &[T; LANES] {
        bytemuck::cast_ref(&self.0)
    }

    /// Mutably borrow the lanes as an array.
    #[inline(always)]
    pub fn as_array_mut(&mut self) -> &mut [T; LANES] {
        bytemuck::cast_mut(&mut self.0)
    }

    /// Consume the batch and return its lanes.
    #[inline(always)]
    pub fn to_array(self) -> [T; LANES] {
        bytemuck::cast(self.0)
    }

    /// Reinterpret the bits of every lane as another lane type.
    #[inline(always)]
    fn cast<U: LaneValue>(self) -> Batch<U> {
        Batch(bytemuck::cast(self.0))
    }
}

impl<T: LaneValue> Clone for Batch<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: LaneValue> Copy for Batch<T> {}

impl<T: LaneValue> Default for Batch<T> {
    fn default() -> Self {
        Batch::splat(T::default())
    }
}

impl<T: LaneValue> PartialEq for Batch<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_array() == other.as_array()
    }
}

impl<T: LaneValue> fmt::Debug for Batch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Batch").field(self.as_array()).finish()
    }
}

/// A per-lane boolean produced by a lane-wise comparison. A set lane has every bit set.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Mask(I32s);

impl Mask {
    /// For each lane, select the lane of `if_true` where the mask is set, and the lane of
    /// `if_false` otherwise.
    #[inline(always)]
    pub fn select<T: LaneValue>(self, if_true: Batch<T>, if_false: Batch<T>) -> Batch<T> {
        let selected = self.0.blend(if_true.cast::<i32>().0, if_false.cast::<i32>().0);
        Batch::<i32>(selected).cast()
    }
}

impl Batch<i32> {
    /// Lane-wise `self >= rhs`.
    #[inline(always)]
    pub fn simd_ge(self, rhs: Self) -> Mask {
        Mask(self.0.cmp_gt(rhs.0) | self.0.cmp_eq(rhs.0))
    }

    /// Lane-wise `self < rhs`.
    #[inline(always)]
    pub fn simd_lt(self, rhs: Self) -> Mask {
        Mask(self.0.cmp_lt(rhs.0))
    }
}

impl Batch<f32> {
    /// Lane-wise `self >= rhs`. False for NaN lanes.
    #[inline(always)]
    pub fn simd_ge(self, rhs: Self) -> Mask {
        Mask(bytemuck::cast(self.0.cmp_ge(rhs.0)))
    }

    /// Lane-wise `self < rhs`. False for NaN lanes.
    #[inline(always)]
    pub fn simd_lt(self, rhs: Self) -> Mask {
        Mask(bytemuck::cast(self.0.cmp_lt(rhs.0)))
    }

    /// Set for every NaN lane.
    #[inline(always)]
    pub fn simd_is_nan(self) -> Mask {
        Mask(bytemuck::cast(self.0.cmp_ne(self.0)))
    }
}

macro_rules! impl_binop {
    ($trait:ident, $func:ident, $t:ty) => {
        impl $trait for Batch<$t> {
            type Output = Batch<$t>;

            #[inline(always)]
            fn $func(self, rhs: Self) -> Self {
                Batch($trait::$func(self.0, rhs.0))
            }
        }
    };
}

macro_rules! impl_shift {
    ($trait:ident, $func:ident, $t:ty) => {
        impl $trait<u32> for Batch<$t> {
            type Output = Batch<$t>;

            #[inline(always)]
            fn $func(self, shift: u32) -> Self {
                debug_assert!(shift < 32);
                Batch($trait::$func(self.0, shift))
            }
        }
    };
}

macro_rules! impl_int_ops {
    ($t:ty) => {
        impl_binop!(Add, add, $t);
        impl_binop!(Sub, sub, $t);
        impl_binop!(BitAnd, bitand, $t);
        impl_binop!(BitOr, bitor, $t);
        impl_binop!(BitXor, bitxor, $t);
        impl_shift!(Shl, shl, $t);
        impl_shift!(Shr, shr, $t);
    };
}

// Shifts on `i32` lanes are arithmetic, shifts on `u32` lanes are logical.
impl_int_ops!(i32);
impl_int_ops!(u32);

impl_binop!(Mul, mul, i32);

impl Mul for Batch<u32> {
    type Output = Batch<u32>;

    // The low 32 bits of a product do not depend on the signedness of its operands.
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        (self.as_i32() * rhs.as_i32()).as_u32()
    }
}

impl_binop!(Add, add, f32);
impl_binop!(Sub, sub, f32);
impl_binop!(Mul, mul, f32);

impl Batch<i32> {
    /// Convert each lane to the nearest `f32`.
    #[inline(always)]
    pub fn to_f32(self) -> Batch<f32> {
        Batch(self.0.round_float())
    }

    /// Reinterpret the bits of each lane as an unsigned integer.
    #[inline(always)]
    pub fn as_u32(self) -> Batch<u32> {
        self.cast()
    }
}

impl Batch<u32> {
    /// Reinterpret the bits of each lane as a signed integer.
    #[inline(always)]
    pub fn as_i32(self) -> Batch<i32> {
        self.cast()
    }

    /// Reinterpret the bits of each lane as a floating point number.
    #[inline(always)]
    pub fn as_f32_bits(self) -> Batch<f32> {
        self.cast()
    }
}

impl Batch<f32> {
    /// Reinterpret each lane as its IEEE-754 bit pattern.
    #[inline(always)]
    pub fn to_bits(self) -> Batch<u32> {
        self.cast()
    }

    /// Round each lane to the nearest integer, with ties rounded to even.
    ///
    /// Identical to `x.round_ties_even() as i32` on every lane: out-of-range lanes saturate to
    /// `i32::MIN` or `i32::MAX`, and NaN lanes convert to 0.
    #[inline(always)]
    pub fn round_ties_even_to_i32(self) -> Batch<i32> {
        let rounded = Batch(self.0.round_int());

        // Vector conversions return `i32::MIN` for every unrepresentable lane.
        let too_large = self.simd_ge(Batch::splat(2_147_483_648.0));
        let nan = self.simd_is_nan();

        too_large.select(Batch::splat(i32::MAX), nan.select(Batch::splat(0), rounded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Vec<i32> {
        (0..(3 * LANES as i32)).map(|x| x - LANES as i32).collect()
    }

    #[test]
    fn verify_load_store() {
        let src = ramp();

        let batch = Batch::load(&src[1..]);
        assert_eq!(&batch.to_array()[..], &src[1..1 + LANES]);

        let mut dst = vec![0; LANES + 3];
        batch.store(&mut dst[3..]);
        assert_eq!(&dst[3..], &src[1..1 + LANES]);
        assert_eq!(&dst[..3], &[0, 0, 0]);
    }

    #[test]
    fn verify_aligned_load_store() {
        let mut aligned = Aligned::default();
        Batch::from_fn(|i| i as u32 * 3).store_aligned(&mut aligned);

        assert_eq!(core::mem::align_of::<Aligned<u32>>(), 32);
        assert_eq!(Batch::load_aligned(&aligned), Batch::from_fn(|i| i as u32 * 3));
    }

    #[test]
    fn verify_partial_load_store() {
        let src = ramp();

        for count in 1..LANES {
            let batch = Batch::load_partial(&src[..count]);

            for lane in 0..LANES {
                let expected = if lane < count { src[lane] } else { 0 };
                assert_eq!(batch.lane(lane), expected);
            }

            let mut dst = vec![i32::MIN; count];
            batch.store_partial(&mut dst);
            assert_eq!(&dst[..], &src[..count]);
        }
    }

    #[test]
    fn verify_lane_access() {
        let mut batch = Batch::from_fn(|i| i as i32);
        batch.as_array_mut()[1] = -7;

        assert_eq!(batch.lane(0), 0);
        assert_eq!(batch.lane(1), -7);
        assert_eq!(batch.as_array()[LANES - 1], LANES as i32 - 1);
        assert_eq!(batch.map(|x| x as f32 * 0.5).lane(1), -3.5);
    }

    #[test]
    fn verify_wrapping_arithmetic() {
        let a = Batch::splat(i32::MAX);
        let b = Batch::splat(1);

        assert_eq!(a + b, Batch::splat(i32::MIN));
        assert_eq!(Batch::splat(i32::MIN) - b, a);
        assert_eq!(Batch::splat(0x1_0000) * Batch::splat(0x1_0000), Batch::splat(0));

        // The dither generator's multiplier overflows every lane.
        let state = Batch::from_fn(|i| 0xdead_beefu32.wrapping_add(i as u32));
        let next = state * Batch::splat(0x0bb3_8435u32) + Batch::splat(0x3619_636bu32);

        for lane in 0..LANES {
            let x = state.lane(lane);
            assert_eq!(next.lane(lane), x.wrapping_mul(0x0bb3_8435).wrapping_add(0x3619_636b));
        }
    }

    #[test]
    fn verify_shifts() {
        assert_eq!(Batch::splat(-256i32) >> 4, Batch::splat(-16));
        assert_eq!(Batch::splat(0xffff_ff00u32) >> 4, Batch::splat(0x0fff_fff0));
        assert_eq!(Batch::splat(0x1234i32) << 16, Batch::splat(0x1234_0000));
        assert_eq!(Batch::splat(0x8000_0001u32) << 31, Batch::splat(0x8000_0000));
    }

    #[test]
    fn verify_select() {
        let values = Batch::from_fn(|i| i as i32 - 2);

        let ge = values.simd_ge(Batch::splat(0));
        let lt = values.simd_lt(Batch::splat(0));

        let selected = ge.select(Batch::splat(1.0f32), Batch::splat(-1.0));
        let inverted = lt.select(Batch::splat(1u32), Batch::splat(0));

        for lane in 0..LANES {
            assert_eq!(selected.lane(lane), if lane >= 2 { 1.0 } else { -1.0 });
            assert_eq!(inverted.lane(lane), if lane < 2 { 1 } else { 0 });
        }

        let floats = Batch::from_fn(|i| [-1.5f32, 0.0, f32::NAN, 2.0][i % 4]);
        let ge = floats.simd_ge(Batch::splat(0.0)).select(Batch::splat(1), Batch::splat(0));
        let nan = floats.simd_is_nan().select(Batch::splat(1), Batch::splat(0));

        for lane in 0..LANES {
            assert_eq!(ge.lane(lane), [0, 1, 0, 1][lane % 4]);
            assert_eq!(nan.lane(lane), [0, 0, 1, 0][lane % 4]);
        }
    }

    #[test]
    fn verify_casts() {
        let batch = Batch::splat(-1.5f32);
        assert_eq!(batch.to_bits().as_f32_bits(), batch);
        assert_eq!(batch.to_bits(), Batch::splat((-1.5f32).to_bits()));
        assert_eq!(Batch::splat(-1i32).as_u32(), Batch::splat(u32::MAX));
        assert_eq!(Batch::splat(u32::MAX).as_i32(), Batch::splat(-1));
        assert_eq!(Batch::splat(3i32).to_f32(), Batch::splat(3.0));
        assert_eq!(Batch::splat(0x7fff_ffc0i32).to_f32(), Batch::splat(0x7fff_ffc0 as f32));
    }

    #[test]
    fn verify_round_ties_even() {
        let inputs = [
            0.4f32,
            0.5,
            1.5,
            2.5,
            -0.5,
            -2.5,
            -3.7,
            32_767.5,
            2_147_483_520.0,
            2_147_483_648.0,
            -2_147_483_648.0,
            -3.0e9,
            1.0e10,
            f32::INFINITY,
            f32::NEG_INFINITY,
            f32::NAN,
        ];

        for chunk in inputs.chunks(LANES) {
            let mut lanes = Aligned::default();
            lanes.0[..chunk.len()].copy_from_slice(chunk);

            let rounded = Batch::load_aligned(&lanes).round_ties_even_to_i32();

            for (lane, &x) in chunk.iter().enumerate() {
                assert_eq!(rounded.lane(lane), x.round_ties_even() as i32, "x = {}", x);
            }
        }
    }
}

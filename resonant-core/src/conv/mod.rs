// Resonant
// Copyright (c) 2024 The Project Resonant Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `conv` module provides methods to convert samples between different sample kinds, and
//! between samples and their wire representation.
//!
//! Exactly one rule applies to each ordered pair of kinds:
//!
//! * Identity, for a kind to itself.
//! * Widening, from a narrower integer to a wider integer. Exact.
//! * Narrowing, from a wider integer to a narrower integer. Dithered when narrowing to `i16`.
//! * Integer to floating point. Exact for `i16` and `i24`, rounded to nearest for `i32`.
//! * Floating point to integer. Dithered.
//!
//! Lossy rules come in two policies. The [`Reference`] policy rounds to nearest and saturates out
//! of range inputs. The [`Fast`] policy assumes the input is in range, and narrows integers by
//! truncation. Every rule is also provided in a lane-parallel form that operates on a [`Batch`]
//! and is bit-for-bit identical to the scalar form.
//!
//! Three families of functions expose the rules: [`convert`] and [`transform`] (the fast policy),
//! [`reference_convert`] and [`reference_transform`], and [`fast_convert`] and [`fast_transform`].
//! The `_with` variant of each function draws dither from the provided generator. The variants
//! without a generator do not dither.

use core::fmt;
use core::str::FromStr;

use crate::batch::{Aligned, Batch, LANES};
use crate::dither::{Dither, NullDither};
use crate::endian::{
    sample_to_wire, sample_to_wire_batch, wire_to_sample, wire_to_sample_batch, WireSample,
    WireWord,
};
use crate::errors::{unsupported_error, Error, Result};
use crate::sample::{i24, IntSample, Sample};

mod fast;
mod reference;

/// `ConvertSample` implements a conversion from `Self` to the sample type `T` under both
/// conversion policies.
pub trait ConvertSample<T: Sample>: Sample {
    /// Convert using the reference rule.
    fn reference<D: Dither>(self, dither: &mut D) -> T;

    /// Convert using the fast rule.
    fn fast<D: Dither>(self, dither: &mut D) -> T;

    /// Convert every lane using the reference rule.
    fn reference_batch<D: Dither>(lanes: Batch<Self::Lane>, dither: &mut D) -> Batch<T::Lane>;

    /// Convert every lane using the fast rule.
    fn fast_batch<D: Dither>(lanes: Batch<Self::Lane>, dither: &mut D) -> Batch<T::Lane>;
}

#[inline(always)]
fn int_to_f32<S: IntSample>(lane: i32) -> f32 {
    lane as f32 * S::DIVISOR
}

#[inline(always)]
fn int_to_f32_batch<S: IntSample>(lanes: Batch<i32>) -> Batch<f32> {
    lanes.to_f32() * Batch::splat(S::DIVISOR)
}

macro_rules! impl_convert {
    ($from:ty, $to:ty, identity) => {
        impl ConvertSample<$to> for $from {
            #[inline(always)]
            fn reference<D: Dither>(self, _: &mut D) -> $to {
                self
            }

            #[inline(always)]
            fn fast<D: Dither>(self, _: &mut D) -> $to {
                self
            }

            #[inline(always)]
            fn reference_batch<D: Dither>(
                lanes: Batch<<$from as Sample>::Lane>,
                _: &mut D,
            ) -> Batch<<$to as Sample>::Lane> {
                lanes
            }

            #[inline(always)]
            fn fast_batch<D: Dither>(
                lanes: Batch<<$from as Sample>::Lane>,
                _: &mut D,
            ) -> Batch<<$to as Sample>::Lane> {
                lanes
            }
        }
    };
    ($from:ty, $to:ty, widen $shift:expr) => {
        impl ConvertSample<$to> for $from {
            #[inline(always)]
            fn reference<D: Dither>(self, _: &mut D) -> $to {
                <$to>::from_lane(self.to_lane().wrapping_shl($shift))
            }

            #[inline(always)]
            fn fast<D: Dither>(self, _: &mut D) -> $to {
                <$to>::from_lane(self.to_lane().wrapping_shl($shift))
            }

            #[inline(always)]
            fn reference_batch<D: Dither>(lanes: Batch<i32>, _: &mut D) -> Batch<i32> {
                lanes << $shift
            }

            #[inline(always)]
            fn fast_batch<D: Dither>(lanes: Batch<i32>, _: &mut D) -> Batch<i32> {
                lanes << $shift
            }
        }
    };
    ($from:ty, $to:ty, narrow $rule:ident, $batch_rule:ident) => {
        impl ConvertSample<$to> for $from {
            #[inline(always)]
            fn reference<D: Dither>(self, dither: &mut D) -> $to {
                <$to>::from_lane(reference::$rule(self.to_lane(), dither))
            }

            #[inline(always)]
            fn fast<D: Dither>(self, dither: &mut D) -> $to {
                <$to>::from_lane(fast::$rule(self.to_lane(), dither))
            }

            #[inline(always)]
            fn reference_batch<D: Dither>(lanes: Batch<i32>, dither: &mut D) -> Batch<i32> {
                reference::$batch_rule(lanes, dither)
            }

            #[inline(always)]
            fn fast_batch<D: Dither>(lanes: Batch<i32>, dither: &mut D) -> Batch<i32> {
                fast::$batch_rule(lanes, dither)
            }
        }
    };
    ($from:ty, f32, int_to_float) => {
        impl ConvertSample<f32> for $from {
            #[inline(always)]
            fn reference<D: Dither>(self, _: &mut D) -> f32 {
                int_to_f32::<$from>(self.to_lane())
            }

            #[inline(always)]
            fn fast<D: Dither>(self, _: &mut D) -> f32 {
                int_to_f32::<$from>(self.to_lane())
            }

            #[inline(always)]
            fn reference_batch<D: Dither>(lanes: Batch<i32>, _: &mut D) -> Batch<f32> {
                int_to_f32_batch::<$from>(lanes)
            }

            #[inline(always)]
            fn fast_batch<D: Dither>(lanes: Batch<i32>, _: &mut D) -> Batch<f32> {
                int_to_f32_batch::<$from>(lanes)
            }
        }
    };
    (f32, $to:ty, float_to_int) => {
        impl ConvertSample<$to> for f32 {
            #[inline(always)]
            fn reference<D: Dither>(self, dither: &mut D) -> $to {
                <$to>::from_lane(reference::f32_to_int::<$to, D>(self, dither))
            }

            #[inline(always)]
            fn fast<D: Dither>(self, dither: &mut D) -> $to {
                <$to>::from_lane(fast::f32_to_int::<$to, D>(self, dither))
            }

            #[inline(always)]
            fn reference_batch<D: Dither>(lanes: Batch<f32>, dither: &mut D) -> Batch<i32> {
                reference::f32_to_int_batch::<$to, D>(lanes, dither)
            }

            #[inline(always)]
            fn fast_batch<D: Dither>(lanes: Batch<f32>, dither: &mut D) -> Batch<i32> {
                fast::f32_to_int_batch::<$to, D>(lanes, dither)
            }
        }
    };
}

// i16 to ...

impl_convert!(i16, i16, identity);
impl_convert!(i16, i24, widen 8);
impl_convert!(i16, i32, widen 16);
impl_convert!(i16, f32, int_to_float);

// i24 to ...

impl_convert!(i24, i16, narrow i24_to_i16, i24_to_i16_batch);
impl_convert!(i24, i24, identity);
impl_convert!(i24, i32, widen 8);
impl_convert!(i24, f32, int_to_float);

// i32 to ...

impl_convert!(i32, i16, narrow i32_to_i16, i32_to_i16_batch);
impl_convert!(i32, i24, narrow i32_to_i24, i32_to_i24_batch);
impl_convert!(i32, i32, identity);
impl_convert!(i32, f32, int_to_float);

// f32 to ...

impl_convert!(f32, i16, float_to_int);
impl_convert!(f32, i24, float_to_int);
impl_convert!(f32, i32, float_to_int);
impl_convert!(f32, f32, identity);

/// Enumeration of conversion policies.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PolicyType {
    /// Round to nearest and saturate. See [`Reference`].
    Reference,
    /// Truncate and do not saturate. See [`Fast`].
    #[default]
    Fast,
}

impl PolicyType {
    /// The canonical lowercase name of the policy.
    pub fn name(&self) -> &'static str {
        match self {
            PolicyType::Reference => "reference",
            PolicyType::Fast => "fast",
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "reference" | "exact" => Ok(PolicyType::Reference),
            "fast" => Ok(PolicyType::Fast),
            _ => unsupported_error("conversion policy"),
        }
    }
}

/// A `Policy` selects the rule applied to each conversion at compile time.
pub trait Policy: Copy + Default + fmt::Debug + Send + Sync + 'static {
    /// The runtime mirror of the policy.
    const TYPE: PolicyType;

    /// Convert one sample.
    fn convert<S, T, D>(sample: S, dither: &mut D) -> T
    where
        S: ConvertSample<T>,
        T: Sample,
        D: Dither;

    /// Convert one batch of lanes.
    fn convert_batch<S, T, D>(lanes: Batch<S::Lane>, dither: &mut D) -> Batch<T::Lane>
    where
        S: ConvertSample<T>,
        T: Sample,
        D: Dither;
}

/// The reference policy.
///
/// Integer narrowing rounds to nearest, with ties away from zero, and saturates. Floating point to
/// integer conversion saturates out of range inputs and rounds to nearest, with ties to even.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Reference;

/// The fast policy.
///
/// Integer narrowing truncates towards negative infinity. No conversion saturates: the caller must
/// guarantee inputs lie within the output's range, otherwise the output is unspecified.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Fast;

impl Policy for Reference {
    const TYPE: PolicyType = PolicyType::Reference;

    #[inline(always)]
    fn convert<S, T, D>(sample: S, dither: &mut D) -> T
    where
        S: ConvertSample<T>,
        T: Sample,
        D: Dither,
    {
        sample.reference(dither)
    }

    #[inline(always)]
    fn convert_batch<S, T, D>(lanes: Batch<S::Lane>, dither: &mut D) -> Batch<T::Lane>
    where
        S: ConvertSample<T>,
        T: Sample,
        D: Dither,
    {
        S::reference_batch(lanes, dither)
    }
}

impl Policy for Fast {
    const TYPE: PolicyType = PolicyType::Fast;

    #[inline(always)]
    fn convert<S, T, D>(sample: S, dither: &mut D) -> T
    where
        S: ConvertSample<T>,
        T: Sample,
        D: Dither,
    {
        sample.fast(dither)
    }

    #[inline(always)]
    fn convert_batch<S, T, D>(lanes: Batch<S::Lane>, dither: &mut D) -> Batch<T::Lane>
    where
        S: ConvertSample<T>,
        T: Sample,
        D: Dither,
    {
        S::fast_batch(lanes, dither)
    }
}

/// The lane type of an endpoint's host sample.
pub type HostLane<E> = <<E as Endpoint>::Host as Sample>::Lane;

/// An `Endpoint` is a value that may be the input or output of a conversion: either a host sample
/// or the wire representation of a host sample.
pub trait Endpoint: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The host sample type the endpoint is converted through.
    type Host: Sample;

    /// Convert the endpoint to its host sample.
    fn into_host(self) -> Self::Host;

    /// Create the endpoint from a host sample.
    fn from_host(host: Self::Host) -> Self;

    /// Load one batch from the first [`LANES`] values of `src`.
    #[inline(always)]
    fn load_lanes(src: &[Self]) -> Batch<HostLane<Self>> {
        load_staged(&src[..LANES])
    }

    /// Store one batch to the first [`LANES`] values of `dst`.
    #[inline(always)]
    fn store_lanes(lanes: Batch<HostLane<Self>>, dst: &mut [Self]) {
        store_staged(lanes, &mut dst[..LANES])
    }

    /// Load fewer than [`LANES`] values. The upper lanes are zero.
    #[inline(always)]
    fn load_lanes_partial(src: &[Self]) -> Batch<HostLane<Self>> {
        debug_assert!(src.len() < LANES);
        load_staged(src)
    }

    /// Store the lower `dst.len()` lanes, where `dst` is shorter than [`LANES`].
    #[inline(always)]
    fn store_lanes_partial(lanes: Batch<HostLane<Self>>, dst: &mut [Self]) {
        debug_assert!(dst.len() < LANES);
        store_staged(lanes, dst)
    }
}

/// Widen up to [`LANES`] endpoints into an aligned lane group and load it. Unused lanes are zero.
#[inline(always)]
fn load_staged<E: Endpoint>(src: &[E]) -> Batch<HostLane<E>> {
    let mut staging = Aligned::default();

    for (lane, x) in staging.0.iter_mut().zip(src) {
        *lane = x.into_host().to_lane();
    }

    Batch::load_aligned(&staging)
}

/// Store a batch to an aligned lane group and narrow its lower `dst.len()` lanes into `dst`.
#[inline(always)]
fn store_staged<E: Endpoint>(lanes: Batch<HostLane<E>>, dst: &mut [E]) {
    let mut staging = Aligned::default();
    lanes.store_aligned(&mut staging);

    for (out, &lane) in dst.iter_mut().zip(&staging.0) {
        *out = E::from_host(E::Host::from_lane(lane));
    }
}

macro_rules! impl_host_endpoint {
    // A sample that is narrower than its lane is widened through an aligned staging area.
    ($t:ty, staged) => {
        impl Endpoint for $t {
            type Host = $t;

            #[inline(always)]
            fn into_host(self) -> $t {
                self
            }

            #[inline(always)]
            fn from_host(host: $t) -> Self {
                host
            }
        }
    };
    // A sample that is its own lane value is loaded and stored in place.
    ($t:ty, direct) => {
        impl Endpoint for $t {
            type Host = $t;

            #[inline(always)]
            fn into_host(self) -> $t {
                self
            }

            #[inline(always)]
            fn from_host(host: $t) -> Self {
                host
            }

            #[inline(always)]
            fn load_lanes(src: &[$t]) -> Batch<$t> {
                Batch::load(src)
            }

            #[inline(always)]
            fn store_lanes(lanes: Batch<$t>, dst: &mut [$t]) {
                lanes.store(dst)
            }

            #[inline(always)]
            fn load_lanes_partial(src: &[$t]) -> Batch<$t> {
                Batch::load_partial(src)
            }

            #[inline(always)]
            fn store_lanes_partial(lanes: Batch<$t>, dst: &mut [$t]) {
                lanes.store_partial(dst)
            }
        }
    };
}

impl_host_endpoint!(i16, staged);
impl_host_endpoint!(i24, staged);
impl_host_endpoint!(i32, direct);
impl_host_endpoint!(f32, direct);

/// Zero-extend up to [`LANES`] wire words into an aligned lane group and decode them.
#[inline(always)]
fn load_wire<S: Sample>(src: &[WireSample<S>]) -> Batch<S::Lane> {
    let mut words = Aligned::default();

    for (word, x) in words.0.iter_mut().zip(src) {
        *word = x.to_bits().to_lane();
    }

    wire_to_sample_batch::<S>(Batch::load_aligned(&words))
}

/// Encode a batch to wire words and store its lower `dst.len()` lanes into `dst`.
#[inline(always)]
fn store_wire<S: Sample>(lanes: Batch<S::Lane>, dst: &mut [WireSample<S>]) {
    let mut words = Aligned::default();
    sample_to_wire_batch::<S>(lanes).store_aligned(&mut words);

    for (out, &word) in dst.iter_mut().zip(&words.0) {
        *out = WireSample::from_bits(<S::Word as WireWord>::from_lane(word));
    }
}

impl<S: Sample> Endpoint for WireSample<S> {
    type Host = S;

    #[inline(always)]
    fn into_host(self) -> S {
        wire_to_sample(self)
    }

    #[inline(always)]
    fn from_host(host: S) -> Self {
        sample_to_wire(host)
    }

    #[inline(always)]
    fn load_lanes(src: &[Self]) -> Batch<S::Lane> {
        load_wire(&src[..LANES])
    }

    #[inline(always)]
    fn store_lanes(lanes: Batch<S::Lane>, dst: &mut [Self]) {
        store_wire(lanes, &mut dst[..LANES])
    }

    #[inline(always)]
    fn load_lanes_partial(src: &[Self]) -> Batch<S::Lane> {
        debug_assert!(src.len() < LANES);
        load_wire(src)
    }

    #[inline(always)]
    fn store_lanes_partial(lanes: Batch<S::Lane>, dst: &mut [Self]) {
        debug_assert!(dst.len() < LANES);
        store_wire(lanes, dst)
    }
}

/// Convert one endpoint to another using the policy `P`, drawing dither from `dither`.
#[inline(always)]
pub fn convert_using<P, I, O, D>(input: I, dither: &mut D) -> O
where
    P: Policy,
    I: Endpoint,
    O: Endpoint,
    I::Host: ConvertSample<O::Host>,
    D: Dither,
{
    O::from_host(P::convert::<I::Host, O::Host, D>(input.into_host(), dither))
}

/// Convert a slice of endpoints to another using the policy `P`, drawing dither from `dither`.
///
/// Whole groups of [`LANES`] samples are converted as batches. For a stateless generator the
/// remainder is converted as one zero-padded batch, otherwise it is converted sample by sample.
/// Either way, the output and the final generator state are identical to converting every sample
/// individually, in order, with [`convert_using`].
///
/// Panics if `output` is shorter than `input`.
pub fn transform_using<P, I, O, D>(input: &[I], output: &mut [O], dither: &mut D)
where
    P: Policy,
    I: Endpoint,
    O: Endpoint,
    I::Host: ConvertSample<O::Host>,
    D: Dither,
{
    assert!(output.len() >= input.len(), "output is shorter than input");

    let output = &mut output[..input.len()];

    let mut src = input.chunks_exact(LANES);
    let mut dst = output.chunks_exact_mut(LANES);

    for (src, dst) in (&mut src).zip(&mut dst) {
        let lanes = P::convert_batch::<I::Host, O::Host, D>(I::load_lanes(src), dither);
        O::store_lanes(lanes, dst);
    }

    let src = src.remainder();
    let dst = dst.into_remainder();

    if src.is_empty() {
        return;
    }

    if D::STATELESS {
        let lanes = P::convert_batch::<I::Host, O::Host, D>(I::load_lanes_partial(src), dither);
        O::store_lanes_partial(lanes, dst);
    }
    else {
        for (&s, d) in src.iter().zip(dst.iter_mut()) {
            *d = convert_using::<P, I, O, D>(s, dither);
        }
    }
}

/// Convert one sample using the fast policy, without dither.
#[inline(always)]
pub fn convert<I, O>(input: I) -> O
where
    I: Endpoint,
    O: Endpoint,
    I::Host: ConvertSample<O::Host>,
{
    convert_using::<Fast, I, O, NullDither>(input, &mut NullDither)
}

/// Convert one sample using the fast policy, drawing dither from `dither`.
#[inline(always)]
pub fn convert_with<I, O, D>(input: I, dither: &mut D) -> O
where
    I: Endpoint,
    O: Endpoint,
    I::Host: ConvertSample<O::Host>,
    D: Dither,
{
    convert_using::<Fast, I, O, D>(input, dither)
}

/// Convert one sample using the reference policy, without dither.
#[inline(always)]
pub fn reference_convert<I, O>(input: I) -> O
where
    I: Endpoint,
    O: Endpoint,
    I::Host: ConvertSample<O::Host>,
{
    convert_using::<Reference, I, O, NullDither>(input, &mut NullDither)
}

/// Convert one sample using the reference policy, drawing dither from `dither`.
#[inline(always)]
pub fn reference_convert_with<I, O, D>(input: I, dither: &mut D) -> O
where
    I: Endpoint,
    O: Endpoint,
    I::Host: ConvertSample<O::Host>,
    D: Dither,
{
    convert_using::<Reference, I, O, D>(input, dither)
}

/// Convert one sample using the fast policy, without dither.
#[inline(always)]
pub fn fast_convert<I, O>(input: I) -> O
where
    I: Endpoint,
    O: Endpoint,
    I::Host: ConvertSample<O::Host>,
{
    convert_using::<Fast, I, O, NullDither>(input, &mut NullDither)
}

/// Convert one sample using the fast policy, drawing dither from `dither`.
#[inline(always)]
pub fn fast_convert_with<I, O, D>(input: I, dither: &mut D) -> O
where
    I: Endpoint,
    O: Endpoint,
    I::Host: ConvertSample<O::Host>,
    D: Dither,
{
    convert_using::<Fast, I, O, D>(input, dither)
}

/// Convert a slice of samples using the fast policy, without dither.
pub fn transform<I, O>(input: &[I], output: &mut [O])
where
    I: Endpoint,
    O: Endpoint,
    I::Host: ConvertSample<O::Host>,
{
    transform_using::<Fast, I, O, NullDither>(input, output, &mut NullDither)
}

/// Convert a slice of samples using the fast policy, drawing dither from `dither`.
pub fn transform_with<I, O, D>(input: &[I], output: &mut [O], dither: &mut D)
where
    I: Endpoint,
    O: Endpoint,
    I::Host: ConvertSample<O::Host>,
    D: Dither,
{
    transform_using::<Fast, I, O, D>(input, output, dither)
}

/// Convert a slice of samples using the reference policy, without dither.
pub fn reference_transform<I, O>(input: &[I], output: &mut [O])
where
    I: Endpoint,
    O: Endpoint,
    I::Host: ConvertSample<O::Host>,
{
    transform_using::<Reference, I, O, NullDither>(input, output, &mut NullDither)
}

/// Convert a slice of samples using the reference policy, drawing dither from `dither`.
pub fn reference_transform_with<I, O, D>(input: &[I], output: &mut [O], dither: &mut D)
where
    I: Endpoint,
    O: Endpoint,
    I::Host: ConvertSample<O::Host>,
    D: Dither,
{
    transform_using::<Reference, I, O, D>(input, output, dither)
}

/// Convert a slice of samples using the fast policy, without dither.
pub fn fast_transform<I, O>(input: &[I], output: &mut [O])
where
    I: Endpoint,
    O: Endpoint,
    I::Host: ConvertSample<O::Host>,
{
    transform_using::<Fast, I, O, NullDither>(input, output, &mut NullDither)
}

/// Convert a slice of samples using the fast policy, drawing dither from `dither`.
pub fn fast_transform_with<I, O, D>(input: &[I], output: &mut [O], dither: &mut D)
where
    I: Endpoint,
    O: Endpoint,
    I::Host: ConvertSample<O::Host>,
    D: Dither,
{
    transform_using::<Fast, I, O, D>(input, output, dither)
}

/// Convert one batch of host sample lanes using the fast policy.
#[inline(always)]
pub fn convert_batch<S, T, D>(lanes: Batch<S::Lane>, dither: &mut D) -> Batch<T::Lane>
where
    S: ConvertSample<T>,
    T: Sample,
    D: Dither,
{
    Fast::convert_batch::<S, T, D>(lanes, dither)
}

/// Convert one batch of host sample lanes using the reference policy.
#[inline(always)]
pub fn reference_convert_batch<S, T, D>(lanes: Batch<S::Lane>, dither: &mut D) -> Batch<T::Lane>
where
    S: ConvertSample<T>,
    T: Sample,
    D: Dither,
{
    Reference::convert_batch::<S, T, D>(lanes, dither)
}

/// Convert one batch of host sample lanes using the fast policy.
#[inline(always)]
pub fn fast_convert_batch<S, T, D>(lanes: Batch<S::Lane>, dither: &mut D) -> Batch<T::Lane>
where
    S: ConvertSample<T>,
    T: Sample,
    D: Dither,
{
    Fast::convert_batch::<S, T, D>(lanes, dither)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dither::{LaneShapedDither, LaneTriangularDither, ShapedDither, TriangularDither};

    #[test]
    fn verify_identity() {
        for x in i16::MIN..=i16::MAX {
            assert_eq!(reference_convert::<i16, i16>(x), x);
            assert_eq!(fast_convert::<i16, i16>(x), x);
        }

        for x in [i24::MIN, i24::from_i32(-1), i24::from_i32(0x12_3456), i24::MAX] {
            assert_eq!(reference_convert::<i24, i24>(x), x);
            assert_eq!(fast_convert::<i24, i24>(x), x);
        }

        for x in [i32::MIN, -1, 0, 0x1234_5678, i32::MAX] {
            assert_eq!(reference_convert::<i32, i32>(x), x);
            assert_eq!(fast_convert::<i32, i32>(x), x);
        }

        for x in [-2.0f32, -1.0, -0.0, 0.5, 1.0, f32::INFINITY] {
            assert_eq!(reference_convert::<f32, f32>(x).to_bits(), x.to_bits());
            assert_eq!(fast_convert::<f32, f32>(x).to_bits(), x.to_bits());
        }
    }

    #[test]
    fn verify_widening() {
        assert_eq!(convert::<i16, i32>(1), 65536);
        assert_eq!(convert::<i16, i32>(-1), -65536);
        assert_eq!(convert::<i16, i24>(0x1234), i24::from_i32(0x12_3400));
        assert_eq!(convert::<i16, i24>(i16::MIN), i24::MIN);
        assert_eq!(convert::<i24, i32>(i24::from_i32(0x12_3456)), 0x1234_5600);
        assert_eq!(convert::<i24, i32>(i24::MIN), i32::MIN);
    }

    #[test]
    fn verify_int_to_float() {
        assert_eq!(convert::<i16, f32>(i16::MIN), -1.0);
        assert_eq!(convert::<i24, f32>(i24::MIN), -1.0);
        assert_eq!(convert::<i32, f32>(i32::MIN), -1.0);
        assert_eq!(convert::<i16, f32>(0x4000), 0.5);
        assert!(convert::<i16, f32>(i16::MAX) < 1.0);
        assert!(convert::<i24, f32>(i24::MAX) < 1.0);
        assert_eq!(convert::<i16, f32>(0x1234).to_bits(), 0x3e11_a000);
        assert_eq!(convert::<i24, f32>(i24::from_i32(0x12_3456)).to_bits(), 0x3e11_a2b0);
    }

    #[test]
    fn verify_float_to_int() {
        assert_eq!(reference_convert::<f32, i16>(2.0), 32767);
        assert_eq!(reference_convert::<f32, i16>(-2.0), -32768);
        assert_eq!(reference_convert::<f32, i24>(-1.0), i24::MIN);
        assert_eq!(reference_convert::<f32, i32>(0.5), 0x4000_0000);
        assert_eq!(fast_convert::<f32, i16>(0.5), 0x4000);
        assert_eq!(fast_convert::<f32, i16>(-1.0), i16::MIN);

        for x in i16::MIN..=i16::MAX {
            let f = convert::<i16, f32>(x);
            assert_eq!(reference_convert::<f32, i16>(f), x);
            assert_eq!(fast_convert::<f32, i16>(f), x);
        }
    }

    #[test]
    fn verify_narrowing() {
        assert_eq!(convert::<i24, i16>(i24::from_i32(0x12_3456)), 0x1234);
        assert_eq!(convert::<i32, i16>(0x1234_5678), 0x1234);
        assert_eq!(convert::<i32, i24>(0x1234_5678), i24::from_i32(0x12_3456));
        assert_eq!(reference_convert::<i32, i16>(i32::MAX), i16::MAX);
        assert_eq!(reference_convert::<i32, i24>(i32::MAX), i24::MAX);
        assert_eq!(reference_convert::<i24, i16>(i24::MAX), i16::MAX);
    }

    #[test]
    fn verify_default_policy_is_fast() {
        // The fast policy truncates where the reference policy rounds.
        let x = 0x1234_ffff;
        assert_eq!(convert::<i32, i16>(x), fast_convert::<i32, i16>(x));
        assert_ne!(convert::<i32, i16>(x), reference_convert::<i32, i16>(x));
        assert_eq!(<Fast as Policy>::TYPE, PolicyType::default());
    }

    #[test]
    fn verify_wire_endpoints() {
        let wire: WireSample<i16> = convert(0x1234i16);
        assert_eq!(wire.to_bytes(), [0x12, 0x34]);

        let wire: WireSample<i16> = convert(i24::from_i32(0x12_3456));
        assert_eq!(wire.to_bytes(), [0x12, 0x34]);

        let wire = WireSample::<i32>::from_bytes([0x12, 0x34, 0x56, 0x78]);
        assert_eq!(convert::<_, i24>(wire), i24::from_i32(0x12_3456));
        assert_eq!(convert::<_, WireSample<i24>>(wire).to_bytes(), [0x12, 0x34, 0x56]);

        let wire: WireSample<f32> = convert(1.0f32);
        assert_eq!(wire.to_bytes(), [0x3f, 0x80, 0x00, 0x00]);
    }

    #[test]
    fn verify_dither_is_drawn_only_when_narrowing() {
        let mut dither = TriangularDither::new();
        let mut expected = TriangularDither::new();

        let _: i32 = convert_with(1i16, &mut dither);
        let _: f32 = convert_with(1i32, &mut dither);
        let _: i24 = convert_with(1i32, &mut dither);
        assert_eq!(dither.generate_int(), expected.generate_int());

        let _: i16 = convert_with(1i32, &mut dither);
        expected.generate_int();
        assert_eq!(dither.generate_int(), expected.generate_int());
    }

    fn verify_endpoint_lanes_for<E: Endpoint>(values: &[E]) {
        assert_eq!(values.len(), LANES + 1);

        let lanes = E::load_lanes(values);

        for (lane, x) in values[..LANES].iter().enumerate() {
            assert_eq!(format!("{:?}", lanes.lane(lane)), format!("{:?}", x.into_host().to_lane()));
        }

        let mut stored = vec![E::default(); LANES + 1];
        E::store_lanes(lanes, &mut stored);
        assert_eq!(&stored[..LANES], &values[..LANES]);
        assert_eq!(stored[LANES], E::default());

        for count in 1..LANES {
            let lanes = E::load_lanes_partial(&values[..count]);

            let zero = HostLane::<E>::default();

            for lane in count..LANES {
                assert_eq!(format!("{:?}", lanes.lane(lane)), format!("{:?}", zero));
            }

            let mut stored = vec![E::default(); count];
            E::store_lanes_partial(lanes, &mut stored);
            assert_eq!(&stored[..], &values[..count]);
        }
    }

    #[test]
    fn verify_endpoint_lanes() {
        let ints: Vec<i32> = (0..=LANES as i32).map(|i| i.wrapping_mul(0x2f1e_3d4d)).collect();

        verify_endpoint_lanes_for::<i16>(&ints.iter().map(|&x| x as i16).collect::<Vec<_>>());
        verify_endpoint_lanes_for::<i24>(
            &ints.iter().map(|&x| i24::from_i32(x)).collect::<Vec<_>>(),
        );
        verify_endpoint_lanes_for::<i32>(&ints);
        verify_endpoint_lanes_for::<f32>(&ints.iter().map(|&x| x as f32).collect::<Vec<_>>());

        verify_endpoint_lanes_for::<WireSample<i16>>(
            &ints.iter().map(|&x| sample_to_wire(x as i16)).collect::<Vec<_>>(),
        );
        verify_endpoint_lanes_for::<WireSample<i24>>(
            &ints.iter().map(|&x| sample_to_wire(i24::from_i32(x))).collect::<Vec<_>>(),
        );
        verify_endpoint_lanes_for::<WireSample<f32>>(
            &ints.iter().map(|&x| sample_to_wire(x as f32 * 1e-9)).collect::<Vec<_>>(),
        );
    }

    #[test]
    fn verify_policy_type() {
        assert_eq!("reference".parse::<PolicyType>(), Ok(PolicyType::Reference));
        assert_eq!("FAST".parse::<PolicyType>(), Ok(PolicyType::Fast));
        assert!("slow".parse::<PolicyType>().is_err());
        assert_eq!(PolicyType::Reference.to_string(), "reference");
    }

    fn verify_transform_matches_scalar<P, I, O, D>(input: &[I], dither: D)
    where
        P: Policy,
        I: Endpoint,
        O: Endpoint,
        I::Host: ConvertSample<O::Host>,
        D: Dither + Clone,
    {
        for len in 0..input.len() {
            let mut batched = dither.clone();
            let mut scalar = dither.clone();

            let mut output = vec![O::default(); len];
            transform_using::<P, I, O, D>(&input[..len], &mut output, &mut batched);

            for (i, (&x, &y)) in input[..len].iter().zip(output.iter()).enumerate() {
                let expected: O = convert_using::<P, I, O, D>(x, &mut scalar);
                assert_eq!(y, expected, "len = {}, i = {}", len, i);
            }

            // Both passes leave the generator in the same state.
            assert_eq!(batched.generate_int(), scalar.generate_int());
        }
    }

    #[test]
    fn verify_transform_matches_scalar_at_every_length() {
        let ints: Vec<i32> =
            (0..(3 * LANES + 3)).map(|i| (i as i32).wrapping_mul(0x1f3d_5b79)).collect();
        let floats: Vec<f32> = ints.iter().map(|&x| x as f32 * (1.1 / 2_147_483_648.0)).collect();

        verify_transform_matches_scalar::<Reference, i32, i16, _>(&ints, NullDither);
        verify_transform_matches_scalar::<Reference, i32, i16, _>(&ints, TriangularDither::new());
        verify_transform_matches_scalar::<Fast, i32, i16, _>(&ints, LaneShapedDither::new());
        verify_transform_matches_scalar::<Reference, f32, i24, _>(&floats, ShapedDither::new());
        verify_transform_matches_scalar::<Reference, f32, WireSample<i16>, _>(
            &floats,
            LaneTriangularDither::new(),
        );
        verify_transform_matches_scalar::<Fast, i32, f32, _>(&ints, NullDither);
    }

    #[test]
    fn verify_transform_ignores_excess_output() {
        let input = [1i16; 5];
        let mut output = [7i32; 9];

        transform(&input, &mut output);

        assert_eq!(&output[..5], &[65536; 5]);
        assert_eq!(&output[5..], &[7; 4]);
    }

    #[test]
    #[should_panic]
    fn verify_transform_panics_on_short_output() {
        let input = [0i16; 4];
        let mut output = [0i32; 3];
        transform(&input, &mut output);
    }

    #[test]
    fn verify_batch_functions() {
        let lanes = Batch::from_fn(|i| i as i32 * 0x100 + 0x80);

        let fast = fast_convert_batch::<i24, i16, _>(lanes, &mut NullDither);
        let reference = reference_convert_batch::<i24, i16, _>(lanes, &mut NullDither);
        let default = convert_batch::<i24, i16, _>(lanes, &mut NullDither);

        for lane in 0..LANES {
            assert_eq!(fast.lane(lane), lane as i32);
            assert_eq!(reference.lane(lane), lane as i32 + 1);
            assert_eq!(default.lane(lane), lane as i32);
        }
    }
}

// Resonant
// Copyright (c) 2024 The Project Resonant Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `dither` module provides the dither generators used to requantize samples.
//!
//! Dithering is the process of adding noise to the least significant digits of a sample before
//! down-converting (quantizing) it to a smaller sample type. The purpose of dithering is to
//! decorrelate the quantization error of the down-conversion from the source signal.
//!
//! Dither is only drawn by lossy conversions: integer narrowing to `i16`, and floating point to
//! integer conversion. Each draw advances the generator, so the output of a conversion depends on
//! the exact order in which samples are converted.
//!
//! Three algorithms are provided:
//!
//! * [`NullDither`] draws no noise.
//! * [`TriangularDither`] draws noise with a triangular probability density (TPDF), formed by
//!   summing two independent uniform draws.
//! * [`ShapedDither`] draws TPDF noise and high-pass filters it by subtracting the previous draw,
//!   moving the noise energy towards less audible high frequencies.
//!
//! The triangular and shaped algorithms are also provided in a lane-parallel form
//! ([`LaneTriangularDither`], [`LaneShapedDither`]) that runs one generator stream per batch lane.
//! Every generator satisfies the same contract: drawing one batch yields exactly the values, and
//! leaves the generator in exactly the state, of [`LANES`] consecutive scalar draws.

use core::fmt;
use core::str::FromStr;

use crate::batch::{Batch, LANES};
use crate::errors::{unsupported_error, Error, Result};
use crate::sample::Sample;

/// A 32-bit linear congruential pseudo-random number generator.
///
/// This PRNG is the basis for all built-in dithering algorithms. It is not statistically strong,
/// but its low bits are never used and it is more than sufficient for dithering audio.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    /// The multiplier applied to the state on every step.
    pub const MULTIPLIER: u32 = 0x0bb3_8435;
    /// The increment added to the state on every step.
    pub const INCREMENT: u32 = 0x3619_636b;
    /// The mask that scrambles the state when jumping to a new stream.
    pub const JUMP_MASK: u32 = 0x8739_cbf1;

    /// Create a generator whose first output follows the state `seed`.
    pub fn new(seed: u32) -> Self {
        Lcg { state: seed }
    }

    /// Advance the generator and return the new state.
    #[inline(always)]
    pub fn next(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(Lcg::MULTIPLIER).wrapping_add(Lcg::INCREMENT);
        self.state
    }

    /// Advance the generator, then scramble the state with a fixed mask. Used to derive
    /// decorrelated streams from a single seed.
    #[inline(always)]
    pub fn jump(&mut self) {
        self.state = self.next() ^ Lcg::JUMP_MASK;
    }
}

/// One [`Lcg`] stream per batch lane.
#[derive(Clone, Debug, PartialEq)]
pub struct LaneLcg {
    state: Batch<u32>,
}

impl LaneLcg {
    /// Seed the lanes from a single scalar seed. Lane `i` is seeded with the `i`-th output of a
    /// scalar generator that is jumped between lanes.
    pub fn new(seed: u32) -> Self {
        let mut gen = Lcg::new(seed);

        let state = Batch::from_fn(|_| {
            let state = gen.next();
            gen.jump();
            state
        });

        LaneLcg { state }
    }

    /// Advance every lane.
    #[inline(always)]
    pub fn next(&mut self) -> Batch<u32> {
        self.state = self.state * Batch::splat(Lcg::MULTIPLIER) + Batch::splat(Lcg::INCREMENT);
        self.state
    }

    /// Advance a single lane.
    #[inline(always)]
    pub fn next_lane(&mut self, lane: usize) -> u32 {
        let state = &mut self.state.as_array_mut()[lane];
        *state = state.wrapping_mul(Lcg::MULTIPLIER).wrapping_add(Lcg::INCREMENT);
        *state
    }

    /// Jump every lane.
    #[inline(always)]
    pub fn jump(&mut self) {
        self.state = self.next() ^ Batch::splat(Lcg::JUMP_MASK);
    }
}

/// `Dither` is a trait for implementing dither generators.
///
/// A generator is owned by one stream of samples and must not be shared between threads. Separate
/// streams should each own an independently seeded generator.
pub trait Dither {
    /// The bit depth of integer dither. Integer draws lie within
    /// `[-2^INT_BITS, 2^INT_BITS - 1]`, or are always zero if `INT_BITS` is 0.
    const INT_BITS: u32;

    /// The peak magnitude of floating point dither. Floating point draws lie within
    /// `[-MAX_FLOAT, MAX_FLOAT]`.
    const MAX_FLOAT: f32;

    /// True if drawing does not change the generator's state.
    const STATELESS: bool = false;

    /// Draw integer dither.
    fn generate_int(&mut self) -> i32;

    /// Draw floating point dither.
    fn generate_float(&mut self) -> f32;

    /// Draw integer dither for every lane of a batch. Identical to [`LANES`] consecutive calls to
    /// [`Dither::generate_int`], in lane order.
    #[inline(always)]
    fn generate_batch_int(&mut self) -> Batch<i32> {
        Batch::from_fn(|_| self.generate_int())
    }

    /// Draw floating point dither for every lane of a batch. Identical to [`LANES`] consecutive
    /// calls to [`Dither::generate_float`], in lane order.
    #[inline(always)]
    fn generate_batch_float(&mut self) -> Batch<f32> {
        Batch::from_fn(|_| self.generate_float())
    }
}

/// Scales a full-range 32-bit integer to `[-1.0, 1.0]`.
const FLOAT_SCALER: f32 = <i32 as Sample>::DIVISOR;

const TRIANGULAR_INT_SHIFT: u32 = 32 - 15;
const TRIANGULAR_FLOAT_SHIFT: u32 = 1;
const SHAPED_INITIAL_SHIFT: u32 = 2;
const SHAPED_INT_SHIFT: u32 = 32 - 15 - (SHAPED_INITIAL_SHIFT - 1);

#[inline(always)]
fn tpdf(r1: u32, r2: u32, shift: u32) -> i32 {
    ((r1 as i32) >> shift) + ((r2 as i32) >> shift)
}

#[inline(always)]
fn tpdf_batch(r1: Batch<u32>, r2: Batch<u32>, shift: u32) -> Batch<i32> {
    (r1.as_i32() >> shift) + (r2.as_i32() >> shift)
}

/// The `NullDither` generator always draws zero.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct NullDither;

impl NullDither {
    /// Instantiate a `NullDither`.
    pub fn new() -> Self {
        NullDither
    }
}

impl Dither for NullDither {
    const INT_BITS: u32 = 0;
    const MAX_FLOAT: f32 = 0.0;
    const STATELESS: bool = true;

    #[inline(always)]
    fn generate_int(&mut self) -> i32 {
        0
    }

    #[inline(always)]
    fn generate_float(&mut self) -> f32 {
        0.0
    }

    #[inline(always)]
    fn generate_batch_int(&mut self) -> Batch<i32> {
        Batch::splat(0)
    }

    #[inline(always)]
    fn generate_batch_float(&mut self) -> Batch<f32> {
        Batch::splat(0.0)
    }
}

/// `TriangularDither` draws triangular probability density dither from a single stream.
#[derive(Clone, Debug)]
pub struct TriangularDither {
    rng: Lcg,
}

impl TriangularDither {
    /// The seed used by [`TriangularDither::new`].
    pub const DEFAULT_SEED: u32 = 0x1942_da21;

    /// Instantiate the generator with the default seed.
    pub fn new() -> Self {
        Self::with_seed(Self::DEFAULT_SEED)
    }

    /// Instantiate the generator with a caller-provided seed.
    pub fn with_seed(seed: u32) -> Self {
        TriangularDither { rng: Lcg::new(seed) }
    }
}

impl Default for TriangularDither {
    fn default() -> Self {
        Self::new()
    }
}

impl Dither for TriangularDither {
    const INT_BITS: u32 = 15;
    const MAX_FLOAT: f32 = 1.0;

    #[inline(always)]
    fn generate_int(&mut self) -> i32 {
        let r1 = self.rng.next();
        let r2 = self.rng.next();
        tpdf(r1, r2, TRIANGULAR_INT_SHIFT)
    }

    #[inline(always)]
    fn generate_float(&mut self) -> f32 {
        let r1 = self.rng.next();
        let r2 = self.rng.next();
        tpdf(r1, r2, TRIANGULAR_FLOAT_SHIFT) as f32 * FLOAT_SCALER
    }
}

/// `ShapedDither` draws high-pass filtered triangular probability density dither from a single
/// stream.
#[derive(Clone, Debug)]
pub struct ShapedDither {
    rng: Lcg,
    previous: i32,
}

impl ShapedDither {
    /// The seed used by [`ShapedDither::new`].
    pub const DEFAULT_SEED: u32 = 0xac9a_d704;

    /// Instantiate the generator with the default seed.
    pub fn new() -> Self {
        Self::with_seed(Self::DEFAULT_SEED)
    }

    /// Instantiate the generator with a caller-provided seed.
    pub fn with_seed(seed: u32) -> Self {
        ShapedDither { rng: Lcg::new(seed), previous: 0 }
    }

    #[inline(always)]
    fn generate_high_pass(&mut self) -> i32 {
        let r1 = self.rng.next();
        let r2 = self.rng.next();
        let current = tpdf(r1, r2, SHAPED_INITIAL_SHIFT);
        let high_pass = current.wrapping_sub(self.previous);
        self.previous = current;
        high_pass
    }
}

impl Default for ShapedDither {
    fn default() -> Self {
        Self::new()
    }
}

impl Dither for ShapedDither {
    const INT_BITS: u32 = 15;
    const MAX_FLOAT: f32 = 1.0;

    #[inline(always)]
    fn generate_int(&mut self) -> i32 {
        self.generate_high_pass() >> SHAPED_INT_SHIFT
    }

    #[inline(always)]
    fn generate_float(&mut self) -> f32 {
        self.generate_high_pass() as f32 * FLOAT_SCALER
    }
}

/// `LaneTriangularDither` draws triangular probability density dither from one stream per batch
/// lane.
///
/// Consecutive scalar draws visit the lanes in order, so a batch draw and [`LANES`] scalar draws
/// are interchangeable at any point.
#[derive(Clone, Debug)]
pub struct LaneTriangularDither {
    rng: LaneLcg,
    cursor: usize,
}

impl LaneTriangularDither {
    /// The seed used by [`LaneTriangularDither::new`].
    pub const DEFAULT_SEED: u32 = 0xfad4_6483;

    /// Instantiate the generator with the default seed.
    pub fn new() -> Self {
        Self::with_seed(Self::DEFAULT_SEED)
    }

    /// Instantiate the generator with a caller-provided seed.
    pub fn with_seed(seed: u32) -> Self {
        LaneTriangularDither { rng: LaneLcg::new(seed), cursor: 0 }
    }

    #[inline(always)]
    fn next_pair(&mut self) -> (u32, u32) {
        let lane = self.cursor;
        self.cursor = (self.cursor + 1) % LANES;
        let r1 = self.rng.next_lane(lane);
        let r2 = self.rng.next_lane(lane);
        (r1, r2)
    }
}

impl Default for LaneTriangularDither {
    fn default() -> Self {
        Self::new()
    }
}

impl Dither for LaneTriangularDither {
    const INT_BITS: u32 = 15;
    const MAX_FLOAT: f32 = 1.0;

    #[inline(always)]
    fn generate_int(&mut self) -> i32 {
        let (r1, r2) = self.next_pair();
        tpdf(r1, r2, TRIANGULAR_INT_SHIFT)
    }

    #[inline(always)]
    fn generate_float(&mut self) -> f32 {
        let (r1, r2) = self.next_pair();
        tpdf(r1, r2, TRIANGULAR_FLOAT_SHIFT) as f32 * FLOAT_SCALER
    }

    #[inline(always)]
    fn generate_batch_int(&mut self) -> Batch<i32> {
        if self.cursor != 0 {
            return Batch::from_fn(|_| self.generate_int());
        }
        let r1 = self.rng.next();
        let r2 = self.rng.next();
        tpdf_batch(r1, r2, TRIANGULAR_INT_SHIFT)
    }

    #[inline(always)]
    fn generate_batch_float(&mut self) -> Batch<f32> {
        if self.cursor != 0 {
            return Batch::from_fn(|_| self.generate_float());
        }
        let r1 = self.rng.next();
        let r2 = self.rng.next();
        tpdf_batch(r1, r2, TRIANGULAR_FLOAT_SHIFT).to_f32() * Batch::splat(FLOAT_SCALER)
    }
}

/// `LaneShapedDither` draws high-pass filtered triangular probability density dither from one
/// stream, with its own filter memory, per batch lane.
#[derive(Clone, Debug)]
pub struct LaneShapedDither {
    rng: LaneLcg,
    previous: Batch<i32>,
    cursor: usize,
}

impl LaneShapedDither {
    /// The seed used by [`LaneShapedDither::new`].
    pub const DEFAULT_SEED: u32 = 0x8914_c30c;

    /// Instantiate the generator with the default seed.
    pub fn new() -> Self {
        Self::with_seed(Self::DEFAULT_SEED)
    }

    /// Instantiate the generator with a caller-provided seed.
    pub fn with_seed(seed: u32) -> Self {
        LaneShapedDither { rng: LaneLcg::new(seed), previous: Batch::splat(0), cursor: 0 }
    }

    #[inline(always)]
    fn generate_high_pass(&mut self) -> i32 {
        let lane = self.cursor;
        self.cursor = (self.cursor + 1) % LANES;

        let r1 = self.rng.next_lane(lane);
        let r2 = self.rng.next_lane(lane);
        let current = tpdf(r1, r2, SHAPED_INITIAL_SHIFT);
        let previous = &mut self.previous.as_array_mut()[lane];
        let high_pass = current.wrapping_sub(*previous);
        *previous = current;
        high_pass
    }

    #[inline(always)]
    fn generate_batch_high_pass(&mut self) -> Batch<i32> {
        debug_assert!(self.cursor == 0);

        let r1 = self.rng.next();
        let r2 = self.rng.next();
        let current = tpdf_batch(r1, r2, SHAPED_INITIAL_SHIFT);
        let high_pass = current - self.previous;
        self.previous = current;
        high_pass
    }
}

impl Default for LaneShapedDither {
    fn default() -> Self {
        Self::new()
    }
}

impl Dither for LaneShapedDither {
    const INT_BITS: u32 = 15;
    const MAX_FLOAT: f32 = 1.0;

    #[inline(always)]
    fn generate_int(&mut self) -> i32 {
        self.generate_high_pass() >> SHAPED_INT_SHIFT
    }

    #[inline(always)]
    fn generate_float(&mut self) -> f32 {
        self.generate_high_pass() as f32 * FLOAT_SCALER
    }

    #[inline(always)]
    fn generate_batch_int(&mut self) -> Batch<i32> {
        if self.cursor != 0 {
            return Batch::from_fn(|_| self.generate_int());
        }
        self.generate_batch_high_pass() >> SHAPED_INT_SHIFT
    }

    #[inline(always)]
    fn generate_batch_float(&mut self) -> Batch<f32> {
        if self.cursor != 0 {
            return Batch::from_fn(|_| self.generate_float());
        }
        self.generate_batch_high_pass().to_f32() * Batch::splat(FLOAT_SCALER)
    }
}

/// Enumeration of dither algorithms.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DitherType {
    /// No dithering.
    #[default]
    Null,
    /// Apply triangular dithering. See [`TriangularDither`] for more details.
    Triangular,
    /// Apply noise-shaped triangular dithering. See [`ShapedDither`] for more details.
    Shaped,
}

impl DitherType {
    /// The canonical lowercase name of the algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            DitherType::Null => "none",
            DitherType::Triangular => "triangular",
            DitherType::Shaped => "shaped",
        }
    }
}

impl fmt::Display for DitherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DitherType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "null" => Ok(DitherType::Null),
            "triangular" | "tpdf" => Ok(DitherType::Triangular),
            "shaped" => Ok(DitherType::Shaped),
            _ => unsupported_error("dither type"),
        }
    }
}

/// A dither generator selected at runtime.
///
/// The triangular and shaped variants hold the lane-parallel generators, which draw identically
/// through the batch and scalar paths.
#[derive(Clone, Debug)]
pub enum AnyDither {
    Null(NullDither),
    Triangular(LaneTriangularDither),
    Shaped(LaneShapedDither),
}

impl AnyDither {
    /// Instantiate a generator of the given type. If no seed is provided, the generator's default
    /// seed is used.
    pub fn new(dither_type: DitherType, seed: Option<u32>) -> Self {
        match dither_type {
            DitherType::Null => AnyDither::Null(NullDither),
            DitherType::Triangular => AnyDither::Triangular(LaneTriangularDither::with_seed(
                seed.unwrap_or(LaneTriangularDither::DEFAULT_SEED),
            )),
            DitherType::Shaped => AnyDither::Shaped(LaneShapedDither::with_seed(
                seed.unwrap_or(LaneShapedDither::DEFAULT_SEED),
            )),
        }
    }

    /// Get the type of the generator.
    pub fn dither_type(&self) -> DitherType {
        match self {
            AnyDither::Null(_) => DitherType::Null,
            AnyDither::Triangular(_) => DitherType::Triangular,
            AnyDither::Shaped(_) => DitherType::Shaped,
        }
    }
}

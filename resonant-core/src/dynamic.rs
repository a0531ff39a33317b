// Resonant
// Copyright (c) 2024 The Project Resonant Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry of converters to support conversion between sample formats that are only known at
//! runtime.
//!
//! A [`ConverterRegistry`] maps each `(input format, output format, policy)` route to a function
//! that converts raw byte buffers. The route is resolved once, when a [`Converter`] is made, so
//! converting a buffer never branches on the sample formats.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use log::{debug, warn};

use crate::batch::LANES;
use crate::conv::{transform_using, ConvertSample, Endpoint, Fast, Policy, PolicyType, Reference};
use crate::dither::{AnyDither, Dither, DitherType};
use crate::endian::{WireSample, WireWord};
use crate::errors::{
    buffer_length_error, buffer_size_error, parse_error, unsupported_error, Error, Result,
};
use crate::sample::{i24, ByteAligned, Kind, Sample};

/// The storage format of a sample: its kind, and whether it is stored in host or wire order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Format {
    /// The kind of the sample.
    pub kind: Kind,
    /// If true, the sample is stored in big-endian wire order. Otherwise, it is stored in host
    /// order.
    pub wire: bool,
}

impl Format {
    /// A host order format.
    pub const fn host(kind: Kind) -> Self {
        Format { kind, wire: false }
    }

    /// A wire order format.
    pub const fn wire(kind: Kind) -> Self {
        Format { kind, wire: true }
    }

    /// The width of one sample in bytes.
    pub fn width(&self) -> usize {
        self.kind.width()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wire {
            write!(f, "{}be", self.kind)
        }
        else {
            write!(f, "{}", self.kind)
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    /// Parse a format. Host formats are named by their kind (`"s16"`). Wire formats are named by
    /// their kind followed by `"be"` (`"s16be"`), or prefixed by `"wire-"` (`"wire-s16"`).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();

        if s.is_empty() {
            return parse_error("empty sample format");
        }

        if let Some(kind) = s.strip_prefix("wire-") {
            return Ok(Format::wire(kind.parse()?));
        }

        if let Some(kind) = s.strip_suffix("be") {
            if let Ok(kind) = kind.parse() {
                return Ok(Format::wire(kind));
            }
        }

        Ok(Format::host(s.parse()?))
    }
}

/// `ConvertOptions` is a common set of options that all converters use.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// The conversion policy.
    pub policy: PolicyType,
    /// The dither algorithm applied by lossy conversions.
    pub dither: DitherType,
    /// The dither seed. If `None`, the algorithm's default seed is used.
    pub seed: Option<u32>,
}

/// An endpoint that may be read from, and written to, a raw byte buffer.
pub trait RawEndpoint: Endpoint {
    /// The storage format of the endpoint.
    const FORMAT: Format;

    /// The packed byte representation of the endpoint.
    type Bytes: ByteAligned;

    fn from_raw(bytes: Self::Bytes) -> Self;

    fn to_raw(self) -> Self::Bytes;
}

macro_rules! impl_raw_endpoint {
    ($t:ty) => {
        impl RawEndpoint for $t {
            const FORMAT: Format = Format::host(<$t as Sample>::KIND);

            type Bytes = <$t as Sample>::RawType;

            #[inline(always)]
            fn from_raw(bytes: Self::Bytes) -> Self {
                <$t>::from_ne_sample_bytes(bytes)
            }

            #[inline(always)]
            fn to_raw(self) -> Self::Bytes {
                self.to_ne_sample_bytes()
            }
        }

        impl RawEndpoint for WireSample<$t> {
            const FORMAT: Format = Format::wire(<$t as Sample>::KIND);

            type Bytes = <<$t as Sample>::Word as WireWord>::Bytes;

            #[inline(always)]
            fn from_raw(bytes: Self::Bytes) -> Self {
                WireSample::from_bytes(bytes)
            }

            #[inline(always)]
            fn to_raw(self) -> Self::Bytes {
                self.to_bytes()
            }
        }
    };
}

impl_raw_endpoint!(i16);
impl_raw_endpoint!(i24);
impl_raw_endpoint!(i32);
impl_raw_endpoint!(f32);

/// The number of samples staged per pass when converting raw buffers. A multiple of [`LANES`].
const CHUNK_LEN: usize = 256;

/// Converts a raw input buffer into a raw output buffer. Both buffers must hold exactly the same
/// number of whole samples.
pub type RawConvertFn = fn(&[u8], &mut [u8], &mut AnyDither);

fn transform_raw<P, I, O, D>(input: &[u8], output: &mut [u8], dither: &mut D)
where
    P: Policy,
    I: RawEndpoint,
    O: RawEndpoint,
    I::Host: ConvertSample<O::Host>,
    D: Dither,
{
    let src: &[I::Bytes] = bytemuck::cast_slice(input);
    let dst: &mut [O::Bytes] = bytemuck::cast_slice_mut(output);

    let mut staged_in = [I::default(); CHUNK_LEN];
    let mut staged_out = [O::default(); CHUNK_LEN];

    for (src, dst) in src.chunks(CHUNK_LEN).zip(dst.chunks_mut(CHUNK_LEN)) {
        let n = src.len();

        for (staged, &raw) in staged_in.iter_mut().zip(src) {
            *staged = I::from_raw(raw);
        }

        transform_using::<P, I, O, D>(&staged_in[..n], &mut staged_out[..n], dither);

        for (raw, &staged) in dst.iter_mut().zip(&staged_out[..n]) {
            *raw = staged.to_raw();
        }
    }
}

fn convert_raw<P, I, O>(input: &[u8], output: &mut [u8], dither: &mut AnyDither)
where
    P: Policy,
    I: RawEndpoint,
    O: RawEndpoint,
    I::Host: ConvertSample<O::Host>,
{
    match dither {
        AnyDither::Null(dither) => transform_raw::<P, I, O, _>(input, output, dither),
        AnyDither::Triangular(dither) => transform_raw::<P, I, O, _>(input, output, dither),
        AnyDither::Shaped(dither) => transform_raw::<P, I, O, _>(input, output, dither),
    }
}

/// Registration details of a converter for a particular route.
#[derive(Copy, Clone)]
pub struct RegisteredConverter {
    /// The input format.
    pub input: Format,
    /// The output format.
    pub output: Format,
    /// The conversion policy.
    pub policy: PolicyType,
    /// The conversion function.
    pub func: RawConvertFn,
}

impl fmt::Debug for RegisteredConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredConverter")
            .field("input", &self.input)
            .field("output", &self.output)
            .field("policy", &self.policy)
            .finish()
    }
}

type Route = (Format, Format, PolicyType);

/// A `ConverterRegistry` allows the registration of converters, and provides a method to make a
/// [`Converter`] for a pair of formats.
#[derive(Default)]
pub struct ConverterRegistry {
    converters: HashMap<Route, RegisteredConverter>,
}

macro_rules! register_outputs {
    ($registry:expr, $policy:ty, $input:ty) => {
        $registry.register::<$policy, $input, i16>();
        $registry.register::<$policy, $input, i24>();
        $registry.register::<$policy, $input, i32>();
        $registry.register::<$policy, $input, f32>();
        $registry.register::<$policy, $input, WireSample<i16>>();
        $registry.register::<$policy, $input, WireSample<i24>>();
        $registry.register::<$policy, $input, WireSample<i32>>();
        $registry.register::<$policy, $input, WireSample<f32>>();
    };
}

macro_rules! register_inputs {
    ($registry:expr, $policy:ty) => {
        register_outputs!($registry, $policy, i16);
        register_outputs!($registry, $policy, i24);
        register_outputs!($registry, $policy, i32);
        register_outputs!($registry, $policy, f32);
        register_outputs!($registry, $policy, WireSample<i16>);
        register_outputs!($registry, $policy, WireSample<i24>);
        register_outputs!($registry, $policy, WireSample<i32>);
        register_outputs!($registry, $policy, WireSample<f32>);
    };
}

impl ConverterRegistry {
    /// Instantiate a new, empty, `ConverterRegistry`.
    pub fn new() -> Self {
        ConverterRegistry { converters: Default::default() }
    }

    /// Register the converter from `I` to `O` using the policy `P`. If a converter was already
    /// registered for the route, it is replaced.
    pub fn register<P, I, O>(&mut self)
    where
        P: Policy,
        I: RawEndpoint,
        O: RawEndpoint,
        I::Host: ConvertSample<O::Host>,
    {
        let route = (I::FORMAT, O::FORMAT, P::TYPE);

        let reg = RegisteredConverter {
            input: I::FORMAT,
            output: O::FORMAT,
            policy: P::TYPE,
            func: convert_raw::<P, I, O>,
        };

        self.converters.insert(route, reg);
    }

    /// Register converters for every pair of host and wire formats, under both policies.
    pub fn register_all(&mut self) {
        register_inputs!(self, Reference);
        register_inputs!(self, Fast);
    }

    /// Get the registration information of the converter for a route.
    pub fn get(
        &self,
        input: Format,
        output: Format,
        policy: PolicyType,
    ) -> Option<&RegisteredConverter> {
        self.converters.get(&(input, output, policy))
    }

    /// The number of registered routes.
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Returns true if no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Make a converter from `input` to `output` with the provided options.
    ///
    /// Returns an error if no converter is registered for the route.
    pub fn make_converter(
        &self,
        input: Format,
        output: Format,
        options: &ConvertOptions,
    ) -> Result<Converter> {
        let Some(reg) = self.get(input, output, options.policy)
        else {
            warn!("no {} converter registered for {} to {}", options.policy, input, output);
            return unsupported_error("conversion route");
        };

        if options.dither == DitherType::Null && options.seed.is_some() {
            warn!("dither seed ignored, dithering is disabled");
        }

        debug!(
            "converting {} to {}: policy={}, dither={}, lanes={}",
            input, output, options.policy, options.dither, LANES
        );

        Ok(Converter {
            input,
            output,
            options: *options,
            func: reg.func,
            dither: AnyDither::new(options.dither, options.seed),
        })
    }
}

/// A `Converter` converts raw byte buffers from one sample format to another.
///
/// A converter owns its dither generator. Consecutive calls to [`Converter::convert_bytes`]
/// continue the same dither stream, so one converter should be used per stream of samples.
pub struct Converter {
    input: Format,
    output: Format,
    options: ConvertOptions,
    func: RawConvertFn,
    dither: AnyDither,
}

impl Converter {
    /// The input format.
    pub fn input_format(&self) -> Format {
        self.input
    }

    /// The output format.
    pub fn output_format(&self) -> Format {
        self.output
    }

    /// The options the converter was made with.
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// The number of output bytes produced for `input_len` input bytes. Trailing bytes that do not
    /// form a whole sample are not counted.
    pub fn output_len(&self, input_len: usize) -> usize {
        (input_len / self.input.width()) * self.output.width()
    }

    /// Convert the samples in `input` and write them to the start of `output`. Returns the number
    /// of samples converted.
    ///
    /// Returns an error if `input` does not hold a whole number of samples, or if `output` is too
    /// small to hold the converted samples.
    pub fn convert_bytes(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let width = self.input.width();

        if input.len() % width != 0 {
            return buffer_length_error(input.len(), width);
        }

        let needed = self.output_len(input.len());

        if output.len() < needed {
            return buffer_size_error(needed, output.len());
        }

        (self.func)(input, &mut output[..needed], &mut self.dither);

        Ok(input.len() / width)
    }

    /// Reset the dither generator to its initial state.
    pub fn reset(&mut self) {
        self.dither = AnyDither::new(self.options.dither, self.options.seed);
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("input", &self.input)
            .field("output", &self.output)
            .field("options", &self.options)
            .field("dither", &self.dither)
            .finish()
    }
}

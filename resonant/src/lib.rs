// Resonant
// Copyright (c) 2024 The Project Resonant Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! # Project Resonant
//!
//! Resonant is a 100% safe Rust engine for converting audio samples between sample formats, with
//! optional dithering, at vector-register throughput.
//!
//! # Support
//!
//! ## Sample kinds
//!
//! | Kind     | Host type | Width   | Range                  |
//! |----------|-----------|---------|------------------------|
//! | Int16    | `i16`     | 2 bytes | `[-2^15, 2^15 - 1]`    |
//! | Int24    | `i24`     | 3 bytes | `[-2^23, 2^23 - 1]`    |
//! | Int32    | `i32`     | 4 bytes | `[-2^31, 2^31 - 1]`    |
//! | Float32  | `f32`     | 4 bytes | `[-1.0, 1.0]`          |
//!
//! Each kind may also be stored in its big-endian wire representation,
//! [`WireSample`][core::endian::WireSample], which is identical on every host and is the only
//! representation that should be persisted or transmitted.
//!
//! ## Dithering
//!
//! | Algorithm  | Generator                                                  |
//! |------------|------------------------------------------------------------|
//! | None       | [`NullDither`][core::dither::NullDither]                   |
//! | Triangular | [`TriangularDither`][core::dither::TriangularDither]       |
//! | Shaped     | [`ShapedDither`][core::dither::ShapedDither]               |
//!
//! ## Policies
//!
//! * The reference policy rounds to nearest and saturates out of range inputs.
//! * The fast policy truncates and requires in-range inputs. It is the default.
//!
//! # Usage
//!
//! For sample formats known at compile time, use the typed functions re-exported at the root of
//! this crate:
//!
//! 1.  Call [`convert`] (or [`reference_convert`], [`fast_convert`]) to convert a single sample.
//! 2.  Call [`transform`] (or [`reference_transform`], [`fast_transform`]) to convert a slice of
//!     samples. Whole groups of [`LANES`][core::batch::LANES] samples are converted in parallel.
//! 3.  To dither, create a generator once per stream of samples, and pass it to the `_with`
//!     variant of each function for every call on that stream.
//!
//! For sample formats only known at runtime:
//!
//! 1.  Get the default [`ConverterRegistry`][core::dynamic::ConverterRegistry] using
//!     [`default::get_registry`], or instantiate one and populate it with
//!     [`default::register_enabled_converters`].
//! 2.  Call [`make_converter`][core::dynamic::ConverterRegistry::make_converter] with the input
//!     and output [`Format`][core::dynamic::Format]s and the
//!     [`ConvertOptions`][core::dynamic::ConvertOptions].
//! 3.  Call [`convert_bytes`][core::dynamic::Converter::convert_bytes] on each buffer of the
//!     stream.

pub mod default {
    //! The `default` module provides a convenience registry with every converter pre-registered.
    //! Using the `default` module is completely optional and incurs no overhead unless actually
    //! used.

    use lazy_static::lazy_static;
    use log::debug;

    use resonant_core::dynamic::{ConvertOptions, Converter, ConverterRegistry, Format};
    use resonant_core::errors::Result;

    lazy_static! {
        static ref CONVERTER_REGISTRY: ConverterRegistry = {
            let mut registry = ConverterRegistry::new();
            register_enabled_converters(&mut registry);
            registry
        };
    }

    /// Gets the default `ConverterRegistry`. This registry pre-registers a converter for every
    /// pair of host and wire formats under both policies.
    ///
    /// This function is lazy and does not instantiate the `ConverterRegistry` until the first call
    /// to this function.
    pub fn get_registry() -> &'static ConverterRegistry {
        &CONVERTER_REGISTRY
    }

    /// Registers every converter on the provided `ConverterRegistry`.
    ///
    /// Use this function to easily populate a custom registry.
    pub fn register_enabled_converters(registry: &mut ConverterRegistry) {
        registry.register_all();
        debug!("registered {} converters", registry.len());
    }

    /// Make a converter using the default registry.
    pub fn make_converter(
        input: Format,
        output: Format,
        options: &ConvertOptions,
    ) -> Result<Converter> {
        get_registry().make_converter(input, output, options)
    }
}

pub use resonant_core as core;

pub use resonant_core::conv::{
    convert, convert_with, fast_convert, fast_convert_with, fast_transform, fast_transform_with,
    reference_convert, reference_convert_with, reference_transform, reference_transform_with,
    transform, transform_with,
};

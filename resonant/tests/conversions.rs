// Resonant
// Copyright (c) 2024 The Project Resonant Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use resonant::core::conv::{ConvertSample, Endpoint};
use resonant::core::dither::TriangularDither;
use resonant::core::endian::{sample_to_wire, wire_to_sample, WireSample};
use resonant::core::sample::{i24, IntSample, Sample};
use resonant::{
    convert, convert_with, fast_convert, reference_convert, reference_convert_with,
    reference_transform, transform,
};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

#[test]
fn verify_int16_vectors() {
    let x = 0x1234i16;

    assert_eq!(convert::<i16, i24>(x), i24::from_i32(0x12_3400));
    assert_eq!(convert::<i16, i32>(x), 0x1234_0000);
    assert_eq!(convert::<i16, f32>(x).to_bits(), 0x3e11_a000);
    assert_eq!(convert::<i16, WireSample<i16>>(x).to_bytes(), [0x12, 0x34]);
}

#[test]
fn verify_int24_vectors() {
    let x = i24::from_i32(0x12_3456);

    assert_eq!(convert::<i24, i16>(x), 0x1234);
    assert_eq!(convert::<i24, i32>(x), 0x1234_5600);
    assert_eq!(convert::<i24, f32>(x).to_bits(), 0x3e11_a2b0);
    assert_eq!(convert::<i24, WireSample<i24>>(x).to_bytes(), [0x12, 0x34, 0x56]);
}

#[test]
fn verify_int32_vectors() {
    let x = 0x1234_5678i32;

    assert_eq!(convert::<i32, i16>(x), 0x1234);
    assert_eq!(convert::<i32, i24>(x), i24::from_i32(0x12_3456));
    assert_eq!(convert::<i32, WireSample<i32>>(x).to_bytes(), [0x12, 0x34, 0x56, 0x78]);
}

#[test]
fn verify_saturation() {
    assert_eq!(reference_convert::<f32, i16>(2.0), 32767);
    assert_eq!(reference_convert::<f32, i16>(-2.0), -32768);
    assert_eq!(reference_convert::<f32, i24>(2.0), i24::MAX);
    assert_eq!(reference_convert::<f32, i24>(-2.0), i24::MIN);
    assert_eq!(reference_convert::<f32, i32>(2.0), i32::MAX);
    assert_eq!(reference_convert::<f32, i32>(-2.0), i32::MIN);

    // Saturation holds with dither, and through the wire format.
    let mut dither = TriangularDither::new();
    for _ in 0..1000 {
        assert_eq!(reference_convert_with::<f32, i16, _>(1.5, &mut dither), 32767);
        assert_eq!(reference_convert_with::<i32, i16, _>(i32::MAX, &mut dither), 32767);
    }

    let wire: WireSample<i16> = reference_convert(-2.0f32);
    assert_eq!(wire.to_bytes(), [0x80, 0x00]);
}

#[test]
fn verify_widening_exactness() {
    assert_eq!(convert::<i16, i32>(1), 65536);
    assert_eq!(convert::<i16, i32>(-1), -65536);

    for x in i16::MIN..=i16::MAX {
        let wide: i24 = convert(x);
        assert_eq!(wide.inner(), i32::from(x) << 8);

        let wide: i32 = convert(wide);
        assert_eq!(wide, i32::from(x) << 16);

        // Narrowing a widened sample is lossless under both policies.
        assert_eq!(reference_convert::<i32, i16>(wide), x);
        assert_eq!(fast_convert::<i32, i16>(wide), x);
    }
}

fn verify_identity_for<S>(values: &[S])
where
    S: Endpoint<Host = S> + Sample + ConvertSample<S>,
{
    let mut output = vec![S::default(); values.len()];

    transform(values, &mut output);
    assert_eq!(&output, values);

    reference_transform(values, &mut output);
    assert_eq!(&output, values);
}

#[test]
fn verify_identity() {
    let mut rng = SmallRng::seed_from_u64(1);

    let i16s: Vec<i16> = (i16::MIN..=i16::MAX).collect();
    let i24s: Vec<i24> = (0..10_000).map(|_| i24::from_i32(rng.random())).collect();
    let i32s: Vec<i32> = (0..10_000).map(|_| rng.random()).collect();
    let f32s: Vec<f32> = (0..10_000).map(|_| rng.random_range(-1.0f32..1.0)).collect();

    verify_identity_for(&i16s);
    verify_identity_for(&i24s);
    verify_identity_for(&i32s);
    verify_identity_for(&f32s);
}

#[test]
fn verify_wire_round_trip() {
    let mut rng = SmallRng::seed_from_u64(2);

    for x in i16::MIN..=i16::MAX {
        assert_eq!(wire_to_sample(sample_to_wire(x)), x);
    }

    for _ in 0..100_000 {
        let x = i24::from_i32(rng.random());
        assert_eq!(wire_to_sample(sample_to_wire(x)), x);

        let x: i32 = rng.random();
        assert_eq!(wire_to_sample(sample_to_wire(x)), x);

        let x = f32::from_bits(rng.random());
        assert_eq!(wire_to_sample(sample_to_wire(x)).to_bits(), x.to_bits());
    }
}

#[test]
fn verify_endianness() {
    let wire: WireSample<i32> = convert(0x0102_0304i32);

    assert_eq!(wire.to_bytes(), [0x01, 0x02, 0x03, 0x04]);

    #[cfg(target_endian = "little")]
    assert_eq!(wire.to_bits().to_ne_bytes(), [0x01, 0x02, 0x03, 0x04]);
    #[cfg(target_endian = "little")]
    assert_eq!(wire.to_bits().to_be_bytes(), [0x04, 0x03, 0x02, 0x01]);

    assert_eq!(convert::<WireSample<i32>, i32>(wire), 0x0102_0304);
}

fn verify_float_agreement<T>(rng: &mut SmallRng)
where
    T: IntSample + Endpoint<Host = T>,
    f32: ConvertSample<T>,
{
    for _ in 0..100_000 {
        let x = rng.random_range(-1.0f32..1.0);
        let scaled = x * T::MULTIPLIER;

        // Skip inputs the reference policy saturates, and exact ties that the portable fast
        // rounding may round differently.
        if scaled >= T::MAX_LANE as f32 || scaled.fract().abs() == 0.5 {
            continue;
        }

        let reference: T = reference_convert(x);
        let fast: T = fast_convert(x);
        assert_eq!(reference, fast, "x = {}", x);
    }
}

#[test]
fn verify_policy_agreement() {
    let mut rng = SmallRng::seed_from_u64(3);

    // Floating point to integer conversions agree exactly without dither.
    verify_float_agreement::<i16>(&mut rng);
    verify_float_agreement::<i24>(&mut rng);
    verify_float_agreement::<i32>(&mut rng);

    // Exact conversions agree exactly.
    for _ in 0..100_000 {
        let x: i32 = rng.random();
        assert_eq!(reference_convert::<i32, f32>(x), fast_convert::<i32, f32>(x));

        let y = i24::from_i32(x);
        assert_eq!(reference_convert::<i24, f32>(y), fast_convert::<i24, f32>(y));
        assert_eq!(reference_convert::<i24, i32>(y), fast_convert::<i24, i32>(y));
    }

    // Integer narrowing differs by at most the rounding bias of one least significant bit.
    for _ in 0..100_000 {
        let x = rng.random_range(-0x7fff_0000..0x7fff_0000);
        let y = i24::from_i32(x >> 8);

        let d = reference_convert::<i32, i16>(x) as i32 - fast_convert::<i32, i16>(x) as i32;
        assert!(d == 0 || d == 1, "x = {:#x}", x);

        let d = reference_convert::<i24, i16>(y) as i32 - fast_convert::<i24, i16>(y) as i32;
        assert!(d == 0 || d == 1, "y = {:?}", y);

        let d = reference_convert::<i32, i24>(x).inner() - fast_convert::<i32, i24>(x).inner();
        assert!(d == 0 || d == 1, "x = {:#x}", x);
    }
}

#[test]
fn verify_policies_agree_at_ties() {
    // A 24-bit sample with a low byte of 0x80 lands exactly halfway between two 16-bit samples
    // once it has passed through floating point.
    for x in [0x80, 0x180, -0x80, -0x180, 0x12_3480, 0x7f_fe80, -0x7f_ff80] {
        let f: f32 = convert(i24::from_i32(x));

        #[cfg(any(
            target_arch = "x86_64",
            all(target_arch = "x86", target_feature = "sse"),
            target_arch = "aarch64"
        ))]
        assert_eq!(reference_convert::<f32, i16>(f), fast_convert::<f32, i16>(f), "x = {:#x}", x);

        // Ties round to even.
        assert_eq!(reference_convert::<f32, i16>(f), ((x >> 8) + ((x >> 8) & 1)) as i16);
    }

    // The same holds for a slice, which is converted in batches.
    let input: Vec<f32> =
        (0..64).map(|i| convert(i24::from_i32((i - 32) * 0x100 + 0x80))).collect();

    let mut reference = vec![0i16; input.len()];
    let mut fast = vec![0i16; input.len()];

    reference_transform(&input, &mut reference);
    transform(&input, &mut fast);

    #[cfg(any(
        target_arch = "x86_64",
        all(target_arch = "x86", target_feature = "sse"),
        target_arch = "aarch64"
    ))]
    assert_eq!(reference, fast);

    assert!(reference.iter().all(|&y| y % 2 == 0));
}

#[test]
fn verify_dithered_conversion_is_ordered() {
    // Converting the same input twice with the same generator draws different dither.
    let mut dither = TriangularDither::new();

    let outputs: Vec<i16> =
        (0..64).map(|_| convert_with::<f32, i16, _>(0.25, &mut dither)).collect();

    assert!(outputs.iter().all(|&y| (y - 8192).abs() <= 1));
    assert!(outputs.iter().any(|&y| y != outputs[0]));

    // A fresh, identically seeded, generator reproduces the sequence.
    let mut dither = TriangularDither::new();
    for &expected in &outputs {
        assert_eq!(convert_with::<f32, i16, _>(0.25, &mut dither), expected);
    }
}

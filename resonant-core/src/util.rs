// Resonant
// Copyright (c) 2024 The Project Resonant Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `util` module provides a repository of commonly used utility functions sorted into distinct
//! categories.

pub mod bits {
    //! Utilities for bit manipulation.

    /// Sign extends an arbitrary, 32-bit or less, signed two's complement integer stored within an
    /// u32 to a full width i32.
    #[inline(always)]
    pub fn sign_extend_leq32_to_i32(value: u32, width: u32) -> i32 {
        // Rust uses an arithmetic shift right (the original sign bit is repeatedly shifted on) for
        // signed integer types. Therefore, shift the value to the left-hand side of the integer,
        // then shift it back to extend the sign bit.
        (value.wrapping_shl(32 - width) as i32).wrapping_shr(32 - width)
    }

    /// Returns a mask with the lower `width` bits set.
    #[inline(always)]
    pub fn mask_lower_u32(width: u32) -> u32 {
        debug_assert!(width <= 32);
        if width == 32 {
            u32::MAX
        }
        else {
            (1 << width) - 1
        }
    }

    /// Returns the sign of a signed integer as an all-ones (negative) or all-zeros (positive or
    /// zero) mask.
    #[inline(always)]
    pub fn sign_mask_i32(value: i32) -> i32 {
        value >> 31
    }

    #[test]
    fn verify_sign_extend() {
        assert_eq!(sign_extend_leq32_to_i32(0x0000_7fff, 16), 32767);
        assert_eq!(sign_extend_leq32_to_i32(0x0000_8000, 16), -32768);
        assert_eq!(sign_extend_leq32_to_i32(0x00ff_ffff, 24), -1);
        assert_eq!(sign_extend_leq32_to_i32(0x007f_ffff, 24), 8_388_607);
        assert_eq!(sign_extend_leq32_to_i32(0xdead_8000, 16), -32768);
        assert_eq!(sign_extend_leq32_to_i32(0x8000_0000, 32), i32::MIN);
    }

    #[test]
    fn verify_masks() {
        assert_eq!(mask_lower_u32(0), 0);
        assert_eq!(mask_lower_u32(16), 0xffff);
        assert_eq!(mask_lower_u32(24), 0xff_ffff);
        assert_eq!(mask_lower_u32(32), 0xffff_ffff);
        assert_eq!(sign_mask_i32(-5), -1);
        assert_eq!(sign_mask_i32(0), 0);
        assert_eq!(sign_mask_i32(i32::MAX), 0);
    }
}

// Resonant
// Copyright (c) 2024 The Project Resonant Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod batch;
pub mod conv;
pub mod dither;
pub mod dynamic;
pub mod endian;
pub mod errors;
pub mod round;
pub mod sample;
pub mod util;

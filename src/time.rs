// Copyright (c) 2026 Figurer Contributors
//
// SPDX-License-Identifier: BSD-3-Clause

//! Thin re-export so the rest of the crate has one place to depend on for
//! wall-clock timing.

pub use std::time::{Duration, Instant};

//! Deterministic phase derivation.
//!
//! The phase of a fragment or signal is a pure function of its text and
//! region, so the same content replayed in another process lands on the
//! same point of the unit circle.

use std::f64::consts::TAU;

/// 32-bit polynomial rolling hash over UTF-16 code units.
///
/// `h = h * 31 + unit` with wrapping `i32` arithmetic, starting from 0.
/// Fixed here so every implementation of the engine agrees on it.
pub fn string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

/// Phase for `content` emitted from `region`, in `[0, 2π)`.
pub fn derive_phase(content: &str, region: &str) -> f64 {
    let mut key = String::with_capacity(content.len() + region.len());
    key.push_str(content);
    key.push_str(region);
    let magnitude = (string_hash(&key) as i64).unsigned_abs() as f64;
    normalize(magnitude)
}

/// Wrap any angle into `[0, 2π)`.
pub fn normalize(theta: f64) -> f64 {
    let wrapped = theta.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

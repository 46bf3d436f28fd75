use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Fraction `elapsed / total` clamped to `[0, 1]`.
///
/// A zero-length span counts as already complete.
pub fn progress(elapsed: Ticks, total: Ticks) -> Fixed64 {
    if total == 0 || elapsed >= total {
        return Fixed64::from_num(1);
    }
    Fixed64::saturating_from_num(elapsed) / Fixed64::saturating_from_num(total)
}

/// Linear interpolation between two integers at fraction `t`.
#[inline]
pub fn lerp(from: i32, to: i32, t: Fixed64) -> Fixed64 {
    let a = Fixed64::from_num(from);
    let b = Fixed64::from_num(to);
    a + (b - a) * t
}

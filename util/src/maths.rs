//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Limit a value to the range `[min, max]`.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T 
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Limit a value to the symmetric range `[-limit, limit]`.
pub fn clamp_sym<T>(value: T, limit: T) -> T
where
    T: Float
{
    clamp(&value, &-limit.abs(), &limit.abs())
}

/// Linear interpolation from `a` to `b` by the factor `t`.
///
/// `t` is limited to `[0, 1]`, so the result always lies between `a` and `b`.
pub fn lerp<T>(a: T, b: T, t: T) -> T
where
    T: Float
{
    let t = clamp(&t, &T::zero(), &T::one());
    a + (b - a) * t
}

/// Move `current` towards `target` by at most `max_step`.
pub fn step_towards<T>(current: T, target: T, max_step: T) -> T
where
    T: Float
{
    current + clamp_sym(target - current, max_step)
}

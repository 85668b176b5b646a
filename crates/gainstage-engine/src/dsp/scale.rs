use super::clip::{hard_clamp, soft_clip};
use crate::error::Result;
use crate::format::Representation;
use crate::frame::Plane;

/// Fractional bits of the fixed-point gain.
pub const FIXED_SHIFT: u32 = 8;
/// Fixed-point representation of unity gain.
pub const FIXED_UNITY: i32 = 1 << FIXED_SHIFT;

/// `gain` as an 8.8 fixed-point factor, saturating at the `i32` limits.
#[inline]
pub fn fixed_gain(gain: f32) -> i32 {
    (gain * FIXED_UNITY as f32).round() as i32
}

/// Scale 16-bit samples by a fixed-point factor, clamping to the i16 range.
pub fn scale_s16(samples: &mut [i16], int_gain: i32) {
    let gain = int_gain as i64;
    for s in samples.iter_mut() {
        let x = (*s as i64 * gain) >> FIXED_SHIFT;
        *s = hard_clamp(x, i16::MIN as i64, i16::MAX as i64) as i16;
    }
}

/// Scale float samples, then either soft-clip or clamp to [-1, 1].
pub fn scale_f32(samples: &mut [f32], gain: f32, soft: bool) {
    if soft {
        for s in samples.iter_mut() {
            *s = soft_clip(*s * gain);
        }
    } else {
        for s in samples.iter_mut() {
            *s = hard_clamp(*s * gain, -1.0, 1.0);
        }
    }
}

/// Apply `gain` to one plane in the negotiated representation.
///
/// Unity gain leaves the plane alone (no copy, no allocation). Otherwise the
/// plane is made writable first, so a failed copy leaves it unmodified.
pub fn process_plane(plane: &mut Plane, gain: f32, repr: Representation, soft: bool) -> Result<()> {
    match repr {
        Representation::Fixed16 => {
            let int_gain = fixed_gain(gain);
            if int_gain != FIXED_UNITY {
                scale_s16(plane.make_writable_s16()?, int_gain);
            }
        }
        Representation::Float => {
            if gain != 1.0 {
                scale_f32(plane.make_writable_f32()?, gain, soft);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Arc;

    #[test]
    fn fixed_gain_rounds_to_eight_fractional_bits() {
        assert_eq!(fixed_gain(1.0), 256);
        assert_eq!(fixed_gain(2.0), 512);
        assert_eq!(fixed_gain(0.5), 128);
        assert_eq!(fixed_gain(1.001), 256);
        assert_eq!(fixed_gain(0.0), 0);
        assert_eq!(fixed_gain(1.0e12), i32::MAX);
    }

    #[test]
    fn doubling_in_fixed_point() {
        let mut samples = [10000i16, -10000, 30000, -30000, 1];
        scale_s16(&mut samples, fixed_gain(2.0));
        assert_eq!(samples, [20000, -20000, 32767, -32768, 2]);
    }

    #[test]
    fn fixed_point_shift_keeps_sign() {
        let mut samples = [-1i16, -3, 3];
        scale_s16(&mut samples, 128);
        // arithmetic shift rounds toward negative infinity
        assert_eq!(samples, [-1, -2, 1]);
    }

    #[test]
    fn huge_fixed_gain_does_not_overflow() {
        let mut samples = [i16::MAX, i16::MIN, 0];
        scale_s16(&mut samples, i32::MAX);
        assert_eq!(samples, [i16::MAX, i16::MIN, 0]);
    }

    #[test]
    fn float_scaling_clamps_or_saturates() {
        let mut hard = [0.25f32, 0.75, -0.75];
        scale_f32(&mut hard, 2.0, false);
        assert_eq!(hard, [0.5, 1.0, -1.0]);

        let mut soft = [0.75f32, -0.75];
        scale_f32(&mut soft, 2.0, true);
        assert!(soft[0] > 0.9 && soft[0] < 1.0);
        assert_eq!(soft[1], -soft[0]);
    }

    #[test]
    fn unity_gain_does_not_touch_shared_planes() {
        let shared = Arc::new(vec![1234i16, -5]);
        let mut plane = Plane::S16(Arc::clone(&shared));
        process_plane(&mut plane, 1.0, Representation::Fixed16, false).unwrap();
        // still the same storage: nothing was copied
        assert!(matches!(&plane, Plane::S16(p) if Arc::ptr_eq(p, &shared)));

        let shared = Arc::new(vec![2.0f32, -0.5]);
        let mut plane = Plane::Float(Arc::clone(&shared));
        process_plane(&mut plane, 1.0, Representation::Float, false).unwrap();
        assert!(matches!(&plane, Plane::Float(p) if Arc::ptr_eq(p, &shared)));
        assert_eq!(plane.as_f32().unwrap(), &[2.0, -0.5]);
    }

    #[test]
    fn near_unity_fixed_gain_is_a_no_op() {
        let mut plane = Plane::S16(Arc::new(vec![32000i16]));
        process_plane(&mut plane, 1.0004, Representation::Fixed16, false).unwrap();
        assert_eq!(plane.as_s16().unwrap(), &[32000]);
    }

    #[test]
    fn scaling_a_shared_plane_leaves_the_original_intact() {
        let shared = Arc::new(vec![0.25f32, 0.5]);
        let mut plane = Plane::Float(Arc::clone(&shared));
        process_plane(&mut plane, 0.5, Representation::Float, false).unwrap();
        assert_eq!(plane.as_f32().unwrap(), &[0.125, 0.25]);
        assert_eq!(shared.as_slice(), &[0.25, 0.5]);
    }

    #[test]
    fn representation_must_match_plane() {
        let mut plane = Plane::Float(Arc::new(vec![0.1]));
        let err = process_plane(&mut plane, 2.0, Representation::Fixed16, false).unwrap_err();
        assert!(matches!(err, Error::FormatMismatch { .. }));
        assert_eq!(plane.as_f32().unwrap(), &[0.1]);
    }

    #[test]
    fn fixed_and_float_paths_agree_within_rounding() {
        let input: Vec<i16> = (-20..20).map(|i| i * 700).collect();
        for gain in [0.3f32, 0.5, 0.9, 1.2, 1.5] {
            let mut fixed = input.clone();
            scale_s16(&mut fixed, fixed_gain(gain));

            let mut float: Vec<f32> = input.iter().map(|&s| s as f32 / 32768.0).collect();
            scale_f32(&mut float, gain, false);

            for (f, x) in fixed.iter().zip(&float) {
                let expected = x * 32768.0;
                // one LSB from the shift, plus the gain's quantisation error
                let tolerance = 1.0 + 32768.0 / 512.0;
                assert!((*f as f32 - expected).abs() <= tolerance, "gain {gain}: {f} vs {expected}");
            }
        }
    }
}

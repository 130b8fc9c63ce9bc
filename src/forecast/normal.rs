//! Standard normal quantile function
//!
//! Acklam's rational approximation, relative error below 1.2e-9 over (0, 1).

#![allow(clippy::excessive_precision)]

const A: [f64; 6] = [
    -3.969_683_028_665_376e1,
    2.209_460_984_245_205e2,
    -2.759_285_104_469_687e2,
    1.383_577_518_672_690e2,
    -3.066_479_806_614_716e1,
    2.506_628_277_459_239,
];

const B: [f64; 5] = [
    -5.447_609_879_822_406e1,
    1.615_858_368_580_409e2,
    -1.556_989_798_598_866e2,
    6.680_131_188_771_972e1,
    -1.328_068_155_288_572e1,
];

const C: [f64; 6] = [
    -7.784_894_002_430_293e-3,
    -3.223_964_580_411_365e-1,
    -2.400_758_277_161_838,
    -2.549_732_539_343_734,
    4.374_664_141_464_968,
    2.938_163_982_698_783,
];

const D: [f64; 4] = [
    7.784_695_709_041_462e-3,
    3.224_671_290_700_398e-1,
    2.445_134_137_142_996,
    3.754_408_661_907_416,
];

/// Break-point between the tail and central approximations
const P_LOW: f64 = 0.02425;

/// Evaluate a polynomial with coefficients in descending order
fn horner(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().fold(0.0, |acc, &c| acc * x + c)
}

/// Lower-tail approximation, valid for `p < P_LOW`
fn lower_tail(p: f64) -> f64 {
    let q = (-2.0 * p.ln()).sqrt();
    horner(&C, q) / (horner(&D, q) * q + 1.0)
}

/// Quantile `x` such that `P(Z <= x) = p` for a standard normal `Z`
///
/// `p` is clamped into the open interval so the result stays finite.
pub fn normal_quantile(p: f64) -> f64 {
    let p = p.clamp(1e-15, 1.0 - 1e-15);

    if p < P_LOW {
        lower_tail(p)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        horner(&A, r) * q / (horner(&B, r) * r + 1.0)
    } else {
        -lower_tail(1.0 - p)
    }
}

/// Critical value for a two-sided interval leaving `tail_mass` outside
///
/// `tail_mass = 0.20` gives the 80% interval multiplier (about 1.2816).
pub fn two_sided_critical_value(tail_mass: f64) -> f64 {
    normal_quantile(1.0 - tail_mass / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_known_quantiles() {
        assert_abs_diff_eq!(normal_quantile(0.5), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(normal_quantile(0.9), 1.281_551_565_5, epsilon = 1e-8);
        assert_abs_diff_eq!(normal_quantile(0.975), 1.959_963_985, epsilon = 1e-8);
        assert_abs_diff_eq!(normal_quantile(0.01), -2.326_347_874, epsilon = 1e-8);
    }

    #[test]
    fn test_symmetry() {
        for p in [0.001, 0.02, 0.1, 0.3] {
            assert_abs_diff_eq!(normal_quantile(p), -normal_quantile(1.0 - p), epsilon = 1e-8);
        }
    }

    #[test]
    fn test_two_sided_critical_value() {
        assert_abs_diff_eq!(two_sided_critical_value(0.20), 1.281_551_565_5, epsilon = 1e-8);
        assert_abs_diff_eq!(two_sided_critical_value(0.05), 1.959_963_985, epsilon = 1e-8);
    }
}

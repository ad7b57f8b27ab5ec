//! Normal-distribution helpers for the per-quote score intervals.

// Coefficients for Acklam's rational approximation of the normal quantile,
// relative error below 1.15e-9 over the whole domain.
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

const P_LOW: f64 = 0.02425;

fn tail(q: f64) -> f64 {
    (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
        / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
}

/// The normal distribution's quantile function, `Φ⁻¹(p)`.
///
/// Returns `None` unless `0 < p < 1`.
pub fn phi_inv(p: f64) -> Option<f64> {
    if !(p > 0.0 && p < 1.0) {
        return None;
    }

    let x = if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    };

    Some(x)
}

/// Inverse error function. Returns `None` unless `-1 < z < 1`.
pub fn erf_inv(z: f64) -> Option<f64> {
    if !(z > -1.0 && z < 1.0) {
        return None;
    }
    phi_inv((z + 1.0) / 2.0).map(|x| x / std::f64::consts::SQRT_2)
}

/// Two-sided critical value for significance level `alpha`.
fn z_score(alpha: f64) -> f64 {
    phi_inv(1.0 - alpha / 2.0).unwrap_or(0.0)
}

/// Confidence interval for the mean of `n` normally distributed samples.
pub fn confidence_interval(mu: f64, sd: f64, n: usize, alpha: f64) -> (f64, f64) {
    if n == 0 {
        return (0.0, 0.0);
    }
    let half = z_score(alpha) * sd / (n as f64).sqrt();
    (mu - half, mu + half)
}

/// Interval that a single future sample falls in with probability `1 - alpha`.
pub fn prediction_interval(mu: f64, sd: f64, alpha: f64) -> (f64, f64) {
    let half = z_score(alpha) * sd;
    (mu - half, mu + half)
}

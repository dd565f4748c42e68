use ndarray::Array2;

/// Idealized delay-Doppler power map: a peak at the given bin that spreads
/// along Doppler with increasing code delay.
pub fn ddm_template(
    doppler_bins: usize,
    code_bins: usize,
    peak_doppler: f64,
    peak_code: f64,
    peak_power: f64,
) -> Array2<f64> {
    Array2::from_shape_fn((doppler_bins, code_bins), |(d, c)| {
        let delay = c as f64 - peak_code;
        let spread = 1.0 + delay.max(0.0).sqrt();
        let doppler = (d as f64 - peak_doppler) / spread;
        let code = if delay < 0.0 { delay / 1.5 } else { delay / 6.0 };
        peak_power * (-(doppler * doppler + code * code) / 2.0).exp()
    })
}

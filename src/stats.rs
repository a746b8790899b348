use ndarray as nd;

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    nd::ArrayView1::from(values).mean()
}

/// Population standard deviation (ddof = 0), `None` for an empty slice
pub fn std(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(nd::ArrayView1::from(values).std(0.))
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10_f64.powi(decimals as i32);
    (value * scale).round() / scale
}

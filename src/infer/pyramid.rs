use crate::error::{Error, Result};

/// Side of the proposal network's receptive window, in pixels.
pub const MIN_DETECTION_SIZE: f64 = 12.0;

/// Scale factors for the image pyramid, largest first.
///
/// The first level maps `min_face_size` onto the 12 pixel window; every
/// further level shrinks by `factor` for as long as the shorter image side
/// stays above the window.
pub fn compute_scales(height: usize, width: usize, min_face_size: f64, factor: f64) -> Result<Vec<f64>> {
    if !(min_face_size > 0.0 && min_face_size.is_finite()) {
        return Err(Error::InvalidConfig(format!("min face size must be positive, got {min_face_size}")));
    }
    if !(factor > 0.0 && factor < 1.0) {
        return Err(Error::InvalidConfig(format!("pyramid factor must be in (0, 1), got {factor}")));
    }

    let m = MIN_DETECTION_SIZE / min_face_size;
    let mut min_length = height.min(width) as f64 * m;
    let mut scales = Vec::new();
    let mut factor_count = 0;
    while min_length > MIN_DETECTION_SIZE {
        scales.push(m * factor.powi(factor_count));
        min_length *= factor;
        factor_count += 1;
    }
    Ok(scales)
}

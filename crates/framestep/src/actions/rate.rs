//! Manual frame-rate adjustment.

/// Lowest frame rate an adjustment can produce.
pub const MIN_FRAME_RATE: f64 = 1.0;

/// `max(1, current + delta * multiplier)`.
pub fn adjusted_frame_rate(current: f64, delta: i32, multiplier: u32) -> f64 {
    (current + f64::from(delta) * f64::from(multiplier)).max(MIN_FRAME_RATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_by_delta_times_multiplier() {
        assert_eq!(adjusted_frame_rate(60.0, 1, 1), 61.0);
        assert_eq!(adjusted_frame_rate(60.0, -1, 10), 50.0);
    }

    #[test]
    fn never_drops_below_one() {
        assert_eq!(adjusted_frame_rate(1.0, -1, 1), 1.0);
        assert_eq!(adjusted_frame_rate(5.0, -1, 10), 1.0);
    }
}

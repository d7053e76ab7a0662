/// Read `signal` at a fractional `position` by linear interpolation.
///
/// Positions outside the buffer clamp to the first/last sample, so a playhead
/// that overshoots by a fraction of a sample before the stop check never
/// indexes out of bounds.
#[inline]
pub fn read_linear(signal: &[f32], position: f64) -> f32 {
    let len = signal.len();
    if len == 0 {
        return 0.0;
    }
    if position <= 0.0 {
        return signal[0];
    }

    let index = position as usize;
    if index + 1 >= len {
        return signal[len - 1];
    }

    let alpha = (position - index as f64) as f32;
    signal[index] * (1.0 - alpha) + signal[index + 1] * alpha
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_between_neighbours() {
        let signal = [0.0, 1.0, -1.0];
        assert_eq!(read_linear(&signal, 0.0), 0.0);
        assert_eq!(read_linear(&signal, 0.5), 0.5);
        assert_eq!(read_linear(&signal, 1.25), 0.5);
    }

    #[test]
    fn clamps_at_edges() {
        let signal = [0.25, 0.5, 0.75];
        assert_eq!(read_linear(&signal, -3.0), 0.25);
        assert_eq!(read_linear(&signal, 2.5), 0.75);
        assert_eq!(read_linear(&signal, 1e9), 0.75);
        assert_eq!(read_linear(&[], 0.0), 0.0);
    }
}

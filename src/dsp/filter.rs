use std::f32::consts::TAU;

use crate::dsp::RenderCtx;

/*
Topology-preserving-transform state-variable filter (Simper / Zavalishin).

Only the low-pass tap is used by the sampler voices. Coefficients are
recomputed once per block from the resolved cutoff, then every sample runs
through the two trapezoidal integrators:

    v3 = x - ic2eq
    v1 = h * (ic1eq + g * v3)        band-pass
    v2 = ic2eq + g * v1              low-pass

    g = tan(pi * fc / fs)            prewarped integrator gain
    k = 2 - 2 * resonance            damping (2 = no peak, 0 = self-oscillation)

k is kept above a small floor so full resonance rings instead of blowing up,
and fc stays just under Nyquist so tan() never approaches its pole.
*/

const MIN_DAMPING: f32 = 0.05;
const MAX_CUTOFF_RATIO: f32 = 0.49;
pub const MIN_CUTOFF_HZ: f32 = 0.001;

pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    pub cutoff_hz: f32,
    pub resonance: f32,

    g: f32,
    k: f32,
    h: f32,
}

impl Default for SVFilter {
    fn default() -> Self {
        Self::lowpass(20_000.0)
    }
}

impl SVFilter {
    pub fn lowpass(cutoff_hz: f32) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            cutoff_hz,
            resonance: 0.0,
            g: 0.0,
            k: 2.0,
            h: 1.0,
        }
    }

    #[inline]
    fn compute_g(&self, ctx: &RenderCtx) -> f32 {
        let fc = self
            .cutoff_hz
            .clamp(MIN_CUTOFF_HZ, ctx.sample_rate * MAX_CUTOFF_RATIO);
        let wd = TAU * fc;
        let wa = (2.0 * ctx.sample_rate) * (wd / (2.0 * ctx.sample_rate)).tan();
        wa / (2.0 * ctx.sample_rate)
    }

    /// Recompute coefficients from `cutoff_hz` / `resonance`. Once per block.
    pub fn update(&mut self, ctx: &RenderCtx) {
        self.g = self.compute_g(ctx);
        self.k = (2.0 - 2.0 * self.resonance.clamp(0.0, 1.0)).max(MIN_DAMPING);
        self.h = 1.0 / (1.0 + self.g * (self.g + self.k));
    }

    #[inline]
    pub fn next_sample(&mut self, sample: f32) -> f32 {
        let v3 = sample - self.ic2eq;
        let v1 = self.h * (self.ic1eq + self.g * v3);
        let v2 = self.ic2eq + self.g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        v2
    }

    pub fn render(&mut self, buffer: &mut [f32], ctx: &RenderCtx) {
        self.update(ctx);
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    pub fn set_cutoff(&mut self, cutoff: f32) {
        self.cutoff_hz = cutoff;
    }

    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance = resonance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (TAU * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    fn peak_after_transient(buffer: &[f32]) -> f32 {
        let skip = buffer.len().min(32);
        buffer
            .get(skip..)
            .unwrap_or(buffer)
            .iter()
            .fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let mut filter = SVFilter::lowpass(500.0);
        let mut buffer = vec![1.0; 128];
        let ctx = RenderCtx::new(48_000.0);

        filter.render(&mut buffer, &ctx);

        assert!(buffer[127] > 0.99);
    }

    #[test]
    fn test_lowpass_filters_high_freq() {
        let ctx = RenderCtx::new(48_000.0);
        let mut filter = SVFilter::lowpass(500.0);
        let mut buffer = sine(5_000.0, ctx.sample_rate, 128);

        filter.render(&mut buffer, &ctx);

        let peak = peak_after_transient(&buffer);
        assert!(peak < 0.3, "Expected high freq attenuation, got peak: {}", peak);
    }

    #[test]
    fn test_set_cutoff_affects_filtering() {
        let ctx = RenderCtx::new(48_000.0);

        let mut filter = SVFilter::lowpass(200.0);
        let mut buffer1 = sine(1_000.0, ctx.sample_rate, 256);
        filter.render(&mut buffer1, &ctx);
        let peak_low_cutoff = peak_after_transient(&buffer1);

        filter.reset();
        filter.set_cutoff(5_000.0);
        let mut buffer2 = sine(1_000.0, ctx.sample_rate, 256);
        filter.render(&mut buffer2, &ctx);
        let peak_high_cutoff = peak_after_transient(&buffer2);

        assert!(
            peak_high_cutoff > peak_low_cutoff * 2.0,
            "High cutoff should pass more signal: high={}, low={}",
            peak_high_cutoff,
            peak_low_cutoff
        );
    }

    #[test]
    fn test_resonance_boosts_cutoff_region() {
        let ctx = RenderCtx::new(48_000.0);

        let mut filter = SVFilter::lowpass(1_000.0);
        filter.set_resonance(0.0);
        let mut flat = sine(1_000.0, ctx.sample_rate, 512);
        filter.render(&mut flat, &ctx);
        let peak_flat = peak_after_transient(&flat);

        filter.reset();
        filter.set_resonance(0.8);
        let mut peaked = sine(1_000.0, ctx.sample_rate, 512);
        filter.render(&mut peaked, &ctx);
        let peak_resonant = peak_after_transient(&peaked);

        assert!(
            peak_resonant > peak_flat * 1.2,
            "resonance should boost signal: resonant={}, flat={}",
            peak_resonant,
            peak_flat
        );
    }

    #[test]
    fn test_extreme_settings_stay_finite() {
        let ctx = RenderCtx::new(44_100.0);
        let mut filter = SVFilter::lowpass(40_000.0);
        filter.set_resonance(1.0);
        let mut buffer = sine(10_000.0, ctx.sample_rate, 4096);
        filter.render(&mut buffer, &ctx);
        assert!(buffer.iter().all(|s| s.is_finite()));

        filter.set_cutoff(0.0);
        filter.render(&mut buffer, &ctx);
        assert!(buffer.iter().all(|s| s.is_finite()));
    }
}

use crate::sound::params::ParamId;

/// Routes one MIDI controller onto one sound parameter.
///
/// A controller value `v` in `0..=127` maps linearly onto `min..=max`; the
/// result still goes through the parameter's own range and ordering clamps.
/// `min > max` is allowed and inverts the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CcMapping {
    pub id: u32,
    pub controller: u8,
    pub param: ParamId,
    pub min: f32,
    pub max: f32,
}

impl CcMapping {
    pub fn value_for(&self, cc_value: u8) -> f32 {
        let t = f32::from(cc_value.min(127)) / 127.0;
        self.min + (self.max - self.min) * t
    }
}

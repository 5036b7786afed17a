use crate::types::ThermostatReading;

pub const OFFSET_STEP_C: f32 = 0.5;

pub fn round_to_offset_step(value: f32) -> f32 {
    let rounded = (value / OFFSET_STEP_C).round() * OFFSET_STEP_C;
    // Avoid handing "-0.0" to the device.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn offsets_match(a: f32, b: f32) -> bool {
    (a - b).abs() < OFFSET_STEP_C / 4.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetCorrection {
    pub ground_truth_c: f32,
    pub device_raw_c: f32,
    pub raw_offset_c: f32,
    pub offset_c: f32,
    pub existing_offset_c: f32,
}

impl OffsetCorrection {
    /// Compares the ground truth against the device's own sensor, i.e. with
    /// the currently stored offset backed out.
    pub fn compute(ground_truth_c: f32, reading: &ThermostatReading) -> Self {
        let device_raw_c = reading.device_raw_temp();
        let raw_offset_c = ground_truth_c - device_raw_c;

        Self {
            ground_truth_c,
            device_raw_c,
            raw_offset_c,
            offset_c: round_to_offset_step(raw_offset_c),
            existing_offset_c: reading.offset_temp,
        }
    }

    pub fn within_limit(&self, max_offset_c: f32) -> bool {
        self.offset_c.abs() <= max_offset_c
    }

    pub fn needs_write(&self) -> bool {
        !offsets_match(self.offset_c, self.existing_offset_c)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationCycleResult {
    pub correction: OffsetCorrection,
    pub changed: bool,
    pub verified: bool,
}

impl CalibrationCycleResult {
    pub fn unchanged(correction: OffsetCorrection) -> Self {
        Self {
            correction,
            changed: false,
            verified: false,
        }
    }

    pub fn written(correction: OffsetCorrection) -> Self {
        Self {
            correction,
            changed: true,
            verified: true,
        }
    }
}

//! Conversion from filtered IADC codes to voltages.
//!
//! In differential mode the converter spans `-Vref..+Vref` across the 12-bit
//! code range. With the 1.2 V internal reference and the front-end gain used
//! by the board this gives a 4.8 V span over 4095 codes.

use crate::frontend::RawSample;

/// Runtime output: volts scaled by 1000 and narrowed to 16 bits.
pub type ScaledVoltage = u16;

/// Code span of a 12-bit conversion.
pub const CODE_SPAN_12BIT: u16 = 0x0FFF;

const MILLI: f64 = 1_000.0;

/// Volts represented by the full code span.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FullScale {
    span_volts: f64,
    code_span: u16,
}

impl FullScale {
    /// Internal 1.2 V reference, differential. This is the scale the sampler uses.
    pub const INTERNAL_1V2_DIFFERENTIAL: Self = Self::new(4.8, CODE_SPAN_12BIT);

    /// 3.3 V AVDD reference, differential (6.6 V span).
    ///
    /// Only valid when bring-up selects [`Reference::Avdd`](crate::bootstrap::Reference::Avdd).
    pub const AVDD_DIFFERENTIAL: Self = Self::new(6.6, CODE_SPAN_12BIT);

    /// Creates a scale spanning `span_volts` over `code_span` codes.
    pub const fn new(span_volts: f64, code_span: u16) -> Self {
        Self {
            span_volts,
            code_span,
        }
    }

    /// Volts across the full code span.
    pub const fn span_volts(&self) -> f64 {
        self.span_volts
    }

    /// Number of codes across the span.
    pub const fn code_span(&self) -> u16 {
        self.code_span
    }

    /// Converts a code to volts.
    pub fn volts(&self, code: RawSample) -> f64 {
        (f64::from(code) * self.span_volts) / f64::from(self.code_span)
    }

    /// Converts a code to signed millivolts, truncating toward zero.
    #[allow(clippy::cast_possible_truncation)]
    pub fn millivolts(&self, code: RawSample) -> i32 {
        (self.volts(code) * MILLI) as i32
    }

    /// Converts a code to the 16-bit runtime output.
    pub fn output(&self, code: RawSample) -> ScaledVoltage {
        to_output(self.volts(code))
    }
}

impl Default for FullScale {
    fn default() -> Self {
        Self::INTERNAL_1V2_DIFFERENTIAL
    }
}

/// Narrows `volts * 1000` to the runtime output.
///
/// Fractions truncate toward zero; negative inputs clamp to 0 and values above
/// 65.535 V clamp to `u16::MAX`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_output(volts: f64) -> ScaledVoltage {
    (volts * MILLI) as ScaledVoltage
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_reference_scales_reference_codes() {
        let scale = FullScale::INTERNAL_1V2_DIFFERENTIAL;

        assert_eq!(scale.output(100), 117);
        assert_eq!(scale.output(2_000), 2_344);
        assert_eq!(scale.output(4_095), 4_800);
        assert_eq!(scale.millivolts(1_000), 1_172);
        assert!((scale.volts(2_000) - 2.344_322_344).abs() < 1e-9);
    }

    #[test]
    fn negative_codes_keep_sign_in_millivolts_only() {
        let scale = FullScale::default();

        assert_eq!(scale.millivolts(-100), -117);
        assert_eq!(scale.output(-100), 0);
    }

    #[test]
    fn output_saturates_above_sixteen_bits() {
        assert_eq!(to_output(70.0), u16::MAX);
        assert_eq!(to_output(0.000_9), 0);
    }

    #[test]
    fn avdd_scale_spans_six_point_six_volts() {
        let scale = FullScale::AVDD_DIFFERENTIAL;
        assert_eq!(scale.output(4_095), 6_600);
        assert_eq!(scale.output(2_047), 3_299);
    }
}

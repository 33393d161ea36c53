use std::fmt;

/// A screen brightness level in `0..=255`, or the unreadable sentinel `-1`.
///
/// Values are never cached: every read asks the platform again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BrightnessValue(i16);

impl BrightnessValue {
    /// The sentinel returned when the platform value cannot be obtained
    /// (missing permission, missing setting, no backlight device).
    pub const UNREADABLE: Self = Self(-1);
    /// The darkest readable level.
    pub const MIN: Self = Self(0);
    /// The brightest readable level.
    pub const MAX: Self = Self(255);

    /// Create a readable value from a level.
    #[must_use]
    pub const fn new(level: u8) -> Self {
        Self(level as i16)
    }

    /// Convert a raw platform integer.
    ///
    /// Negative values map to [`Self::UNREADABLE`]; values above 255 clamp.
    #[must_use]
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            Self::UNREADABLE
        } else {
            // Clamped to 0..=255, so the cast is lossless.
            #[allow(clippy::cast_possible_truncation)]
            Self(raw.min(255) as i16)
        }
    }

    /// Scale `current / max` to `0..=255`, rounding to nearest.
    ///
    /// A zero `max` is unreadable.
    #[must_use]
    pub fn from_ratio(current: u64, max: u64) -> Self {
        if max == 0 {
            return Self::UNREADABLE;
        }
        let current = u128::from(current.min(max));
        let max = u128::from(max);
        let scaled = (current * 255 + max / 2) / max;
        Self::from_raw(i64::try_from(scaled).unwrap_or(255))
    }

    /// Scale a fraction in `0.0..=1.0` to `0..=255`, rounding to nearest.
    ///
    /// NaN and negative fractions are unreadable; values above 1.0 clamp.
    #[must_use]
    pub fn from_fraction(fraction: f32) -> Self {
        if fraction.is_nan() || fraction < 0.0 {
            return Self::UNREADABLE;
        }
        #[allow(clippy::cast_possible_truncation)]
        let level = (fraction.min(1.0) * 255.0).round() as i64;
        Self::from_raw(level)
    }

    /// The raw value in `-1..=255`.
    #[must_use]
    pub const fn get(self) -> i16 {
        self.0
    }

    /// The level, or `None` when unreadable.
    #[must_use]
    pub const fn level(self) -> Option<u8> {
        if self.0 < 0 {
            None
        } else {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Some(self.0 as u8)
        }
    }

    /// Whether the platform produced a real value.
    #[must_use]
    pub const fn is_readable(self) -> bool {
        self.0 >= 0
    }

    /// The level as a fraction of full brightness.
    #[must_use]
    pub fn fraction(self) -> Option<f32> {
        self.level().map(|level| f32::from(level) / 255.0)
    }
}

impl Default for BrightnessValue {
    fn default() -> Self {
        Self::UNREADABLE
    }
}

impl From<u8> for BrightnessValue {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}

impl From<BrightnessValue> for i16 {
    fn from(value: BrightnessValue) -> Self {
        value.0
    }
}

impl From<BrightnessValue> for i32 {
    fn from(value: BrightnessValue) -> Self {
        Self::from(value.0)
    }
}

impl fmt::Display for BrightnessValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_readable() {
            write!(f, "{}", self.0)
        } else {
            f.write_str("unreadable")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BrightnessValue;

    #[test]
    fn raw_values_clamp_and_flag_unreadable() {
        assert_eq!(BrightnessValue::from_raw(128).get(), 128);
        assert_eq!(BrightnessValue::from_raw(0), BrightnessValue::MIN);
        assert_eq!(BrightnessValue::from_raw(255), BrightnessValue::MAX);
        assert_eq!(BrightnessValue::from_raw(4095), BrightnessValue::MAX);
        assert_eq!(BrightnessValue::from_raw(-1), BrightnessValue::UNREADABLE);
        assert_eq!(BrightnessValue::from_raw(i64::MIN), BrightnessValue::UNREADABLE);
    }

    #[test]
    fn ratio_rounds_to_nearest() {
        assert_eq!(BrightnessValue::from_ratio(0, 100), BrightnessValue::MIN);
        assert_eq!(BrightnessValue::from_ratio(100, 100), BrightnessValue::MAX);
        assert_eq!(BrightnessValue::from_ratio(50, 100).get(), 128);
        assert_eq!(BrightnessValue::from_ratio(19_200, 96_000).get(), 51);
        assert_eq!(BrightnessValue::from_ratio(7, 0), BrightnessValue::UNREADABLE);
        assert_eq!(BrightnessValue::from_ratio(200, 100), BrightnessValue::MAX);
    }

    #[test]
    fn fraction_scaling() {
        assert_eq!(BrightnessValue::from_fraction(0.0), BrightnessValue::MIN);
        assert_eq!(BrightnessValue::from_fraction(1.0), BrightnessValue::MAX);
        assert_eq!(BrightnessValue::from_fraction(0.5).get(), 128);
        assert_eq!(BrightnessValue::from_fraction(1.5), BrightnessValue::MAX);
        assert_eq!(BrightnessValue::from_fraction(-0.1), BrightnessValue::UNREADABLE);
        assert_eq!(BrightnessValue::from_fraction(f32::NAN), BrightnessValue::UNREADABLE);
    }

    #[test]
    fn accessors() {
        let value = BrightnessValue::new(51);
        assert_eq!(value.level(), Some(51));
        assert!(value.is_readable());
        assert!((value.fraction().unwrap() - 0.2).abs() < f32::EPSILON);
        assert_eq!(i32::from(value), 51);

        assert_eq!(BrightnessValue::UNREADABLE.level(), None);
        assert_eq!(BrightnessValue::UNREADABLE.fraction(), None);
        assert_eq!(BrightnessValue::default(), BrightnessValue::UNREADABLE);
        assert_eq!(BrightnessValue::UNREADABLE.to_string(), "unreadable");
        assert_eq!(BrightnessValue::MAX.to_string(), "255");
    }
}

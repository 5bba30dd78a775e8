//! Conversion between decimal degrees and the degrees/minutes/seconds form
//! GPS tags store.

use raves_geotag_types::exif::primitives::Rational;

/// Seconds are stored in thousandths of an arcsecond.
pub const SECONDS_DENOMINATOR: u32 = 1000;

/// An unsigned angle, split into degrees, minutes, and seconds.
///
/// The sign lives in the matching reference tag (`N`/`S`, `E`/`W`), never
/// here.
#[derive(Clone, Copy, Debug, Hash, PartialEq, PartialOrd, Eq, Ord)]
pub struct Dms {
    /// Whole degrees.
    pub degrees: u32,

    /// Whole minutes, in `0..60`.
    pub minutes: u32,

    /// Seconds, multiplied by [`SECONDS_DENOMINATOR`] and rounded.
    pub seconds_thousandths: u32,
}

impl Dms {
    /// Splits an absolute decimal angle into degrees, minutes, and seconds.
    ///
    /// ```
    /// use raves_geotag::exif::dms::Dms;
    ///
    /// let dms = Dms::from_decimal(33.8568);
    /// assert_eq!((dms.degrees, dms.minutes, dms.seconds_thousandths), (33, 51, 24480));
    /// ```
    pub fn from_decimal(absolute_degrees: f64) -> Self {
        debug_assert!(
            absolute_degrees.is_finite() && absolute_degrees >= 0.0,
            "DMS conversion takes the absolute value of a coordinate. got: `{absolute_degrees}`"
        );

        let degrees = absolute_degrees.floor();
        let minutes_float = (absolute_degrees - degrees) * 60.0;
        let minutes = minutes_float.floor();
        let seconds = (minutes_float - minutes) * 60.0;

        Self {
            degrees: degrees as u32,
            minutes: minutes as u32,
            seconds_thousandths: (seconds * SECONDS_DENOMINATOR as f64).round() as u32,
        }
    }

    /// The three rationals written for a `GPSLatitude` or `GPSLongitude` tag.
    pub const fn to_rationals(&self) -> [Rational; 3] {
        [
            Rational::new(self.degrees, 1),
            Rational::new(self.minutes, 1),
            Rational::new(self.seconds_thousandths, SECONDS_DENOMINATOR),
        ]
    }

    /// Turns the rationals of a `GPSLatitude` or `GPSLongitude` tag back into
    /// an absolute decimal angle.
    ///
    /// Any denominators are accepted, since other writers pick their own.
    /// Returns `None` if one of them is zero.
    pub fn decimal_from_rationals(rationals: &[Rational; 3]) -> Option<f64> {
        let [degrees, minutes, seconds] = rationals;
        Some(degrees.to_f64()? + minutes.to_f64()? / 60.0 + seconds.to_f64()? / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use raves_geotag_types::exif::primitives::Rational;

    use super::Dms;
    use crate::util::logger;

    #[test]
    fn sydney_opera_house() {
        logger();

        assert_eq!(
            Dms::from_decimal(33.8568),
            Dms {
                degrees: 33,
                minutes: 51,
                seconds_thousandths: 24480
            }
        );
        assert_eq!(
            Dms::from_decimal(151.2153),
            Dms {
                degrees: 151,
                minutes: 12,
                seconds_thousandths: 55080
            }
        );
    }

    #[test]
    fn zero() {
        logger();

        let dms = Dms::from_decimal(0.0);
        assert_eq!(
            dms.to_rationals(),
            [
                Rational::new(0, 1),
                Rational::new(0, 1),
                Rational::new(0, 1000)
            ]
        );
    }

    #[test]
    fn extremes() {
        logger();

        assert_eq!(
            Dms::from_decimal(180.0),
            Dms {
                degrees: 180,
                minutes: 0,
                seconds_thousandths: 0
            }
        );
        assert_eq!(
            Dms::from_decimal(90.0),
            Dms {
                degrees: 90,
                minutes: 0,
                seconds_thousandths: 0
            }
        );
    }

    /// Converting there and back should stay within the precision of a
    /// thousandth of an arcsecond.
    #[test]
    fn decimal_survives_a_round_trip() {
        logger();

        for value in [0.0, 0.5, 2.2945, 33.8568, 48.8575, 89.999999, 151.2153, 179.99] {
            let back = Dms::decimal_from_rationals(&Dms::from_decimal(value).to_rationals())
                .expect("denominators are never zero");
            log::debug!("{value} -> {back}");
            assert!((value - back).abs() < 1e-6, "{value} became {back}");
        }
    }

    #[test]
    fn foreign_and_zero_denominators() {
        logger();

        // 48° 51' 29.6"
        let eiffel = [
            Rational::new(48, 1),
            Rational::new(51, 1),
            Rational::new(296, 10),
        ];
        let got = Dms::decimal_from_rationals(&eiffel).unwrap();
        assert!((got - 48.858222).abs() < 1e-6);

        assert_eq!(
            Dms::decimal_from_rationals(&[
                Rational::new(1, 1),
                Rational::new(2, 0),
                Rational::new(3, 1)
            ]),
            None
        );
    }
}

//! The location value that gets written into (and read out of) a file.

/// A point on the Earth, in decimal degrees.
///
/// A `Geotag` can only be made through [`Geotag::new`], which checks its
/// range. That means any `Geotag` you hold is safe to encode.
///
/// ```
/// use raves_geotag_types::geotag::{Geotag, LatitudeRef, LongitudeRef};
///
/// let opera_house = Geotag::new(-33.8568, 151.2153).unwrap();
/// assert_eq!(opera_house.latitude_ref(), LatitudeRef::South);
/// assert_eq!(opera_house.longitude_ref(), LongitudeRef::East);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Geotag {
    latitude: f64,
    longitude: f64,
}

impl Geotag {
    /// Creates a geotag, checking that both coordinates are finite and within
    /// `[-90, 90]` (latitude) and `[-180, 180]` (longitude).
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NotFinite {
                latitude,
                longitude,
            });
        }

        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }

        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// The latitude, in decimal degrees. Negative values are south.
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// The longitude, in decimal degrees. Negative values are west.
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Which side of the equator this geotag is on.
    ///
    /// Zero counts as north.
    pub fn latitude_ref(&self) -> LatitudeRef {
        if self.latitude >= 0.0 {
            LatitudeRef::North
        } else {
            LatitudeRef::South
        }
    }

    /// Which side of the prime meridian this geotag is on.
    ///
    /// Zero counts as east.
    pub fn longitude_ref(&self) -> LongitudeRef {
        if self.longitude >= 0.0 {
            LongitudeRef::East
        } else {
            LongitudeRef::West
        }
    }
}

/// The hemisphere of a latitude, stored as `GPSLatitudeRef`.
#[derive(Clone, Copy, Debug, Hash, PartialEq, PartialOrd, Eq, Ord)]
pub enum LatitudeRef {
    /// `N`
    North,
    /// `S`
    South,
}

impl LatitudeRef {
    /// The ASCII character written for this reference.
    pub const fn ascii(&self) -> u8 {
        match self {
            LatitudeRef::North => b'N',
            LatitudeRef::South => b'S',
        }
    }

    /// The sign this reference gives a decimal latitude.
    pub const fn sign(&self) -> f64 {
        match self {
            LatitudeRef::North => 1.0,
            LatitudeRef::South => -1.0,
        }
    }
}

impl TryFrom<u8> for LatitudeRef {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value.to_ascii_uppercase() {
            b'N' => Ok(Self::North),
            b'S' => Ok(Self::South),
            _ => Err(()),
        }
    }
}

/// The hemisphere of a longitude, stored as `GPSLongitudeRef`.
#[derive(Clone, Copy, Debug, Hash, PartialEq, PartialOrd, Eq, Ord)]
pub enum LongitudeRef {
    /// `E`
    East,
    /// `W`
    West,
}

impl LongitudeRef {
    /// The ASCII character written for this reference.
    pub const fn ascii(&self) -> u8 {
        match self {
            LongitudeRef::East => b'E',
            LongitudeRef::West => b'W',
        }
    }

    /// The sign this reference gives a decimal longitude.
    pub const fn sign(&self) -> f64 {
        match self {
            LongitudeRef::East => 1.0,
            LongitudeRef::West => -1.0,
        }
    }
}

impl TryFrom<u8> for LongitudeRef {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value.to_ascii_uppercase() {
            b'E' => Ok(Self::East),
            b'W' => Ok(Self::West),
            _ => Err(()),
        }
    }
}

/// A geotag couldn't be made from the given coordinates.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub enum CoordinateError {
    /// One of the coordinates was NaN or infinite.
    NotFinite { latitude: f64, longitude: f64 },

    /// The latitude wasn't within `[-90, 90]`.
    LatitudeOutOfRange(f64),

    /// The longitude wasn't within `[-180, 180]`.
    LongitudeOutOfRange(f64),
}

impl core::fmt::Display for CoordinateError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFinite {
                latitude,
                longitude,
            } => write!(
                f,
                "Coordinates must be finite numbers. \
                got: latitude `{latitude}`, longitude `{longitude}`"
            ),
            Self::LatitudeOutOfRange(got) => write!(
                f,
                "Latitude must be within `-90` and `90` degrees. got: `{got}`"
            ),
            Self::LongitudeOutOfRange(got) => write!(
                f,
                "Longitude must be within `-180` and `180` degrees. got: `{got}`"
            ),
        }
    }
}

impl core::error::Error for CoordinateError {}

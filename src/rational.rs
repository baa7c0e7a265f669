//! Rational numbers and GPS coordinate triples as stored in TIFF entries

use std::fmt;

/// Unsigned TIFF rational (format 5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

/// Signed TIFF rational (format 10)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SignedRational {
    pub numerator: i32,
    pub denominator: i32,
}

/// Largest denominator tried when approximating a decimal
const MAX_DENOMINATOR: u32 = 1_000_000;

impl Rational {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Convert to a double; a zero denominator yields 0.0
    pub fn to_f64(self) -> f64 {
        if self.denominator == 0 {
            0.0
        } else {
            self.numerator as f64 / self.denominator as f64
        }
    }

    /// Approximate a non-negative decimal with a power-of-ten denominator
    ///
    /// Negative and non-finite inputs clamp to 0/1.
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() || value <= 0.0 {
            return Self::new(0, 1);
        }
        let mut denominator = MAX_DENOMINATOR;
        while denominator > 1 && value * denominator as f64 > u32::MAX as f64 {
            denominator /= 10;
        }
        let numerator = (value * denominator as f64).round().min(u32::MAX as f64) as u32;
        Self::new(numerator, denominator).reduced()
    }

    fn reduced(self) -> Self {
        let g = gcd(self.numerator, self.denominator);
        if g <= 1 {
            self
        } else {
            Self::new(self.numerator / g, self.denominator / g)
        }
    }
}

impl SignedRational {
    pub const fn new(numerator: i32, denominator: i32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Convert to a double; a zero denominator yields 0.0
    pub fn to_f64(self) -> f64 {
        if self.denominator == 0 {
            0.0
        } else {
            self.numerator as f64 / self.denominator as f64
        }
    }

    /// Approximate a decimal with a power-of-ten denominator
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() {
            return Self::new(0, 1);
        }
        let magnitude = Rational::from_f64(value.abs());
        let numerator = magnitude.numerator.min(i32::MAX as u32) as i32;
        let denominator = magnitude.denominator.min(i32::MAX as u32) as i32;
        Self::new(
            if value < 0.0 { -numerator } else { numerator },
            denominator,
        )
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl fmt::Display for SignedRational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl From<u32> for Rational {
    fn from(value: u32) -> Self {
        Self::new(value, 1)
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Degrees, minutes and seconds of a GPS latitude or longitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CoordinateTriple {
    pub degrees: Rational,
    pub minutes: Rational,
    pub seconds: Rational,
}

impl CoordinateTriple {
    pub const fn new(degrees: Rational, minutes: Rational, seconds: Rational) -> Self {
        Self {
            degrees,
            minutes,
            seconds,
        }
    }

    /// Unsigned decimal degrees; the hemisphere reference supplies the sign
    pub fn to_degrees(&self) -> f64 {
        self.degrees.to_f64() + self.minutes.to_f64() / 60.0 + self.seconds.to_f64() / 3600.0
    }

    /// Split the magnitude of `degrees` into whole degrees, whole minutes and
    /// seconds with millisecond precision
    pub fn from_degrees(degrees: f64) -> Self {
        let value = if degrees.is_finite() { degrees.abs() } else { 0.0 };
        let whole = value.floor();
        let minutes_total = (value - whole) * 60.0;
        let minutes = minutes_total.floor();
        let seconds = (minutes_total - minutes) * 60.0;
        Self::new(
            Rational::new(whole as u32, 1),
            Rational::new(minutes as u32, 1),
            Rational::new((seconds * 1000.0).round() as u32, 1000),
        )
    }
}

impl fmt::Display for CoordinateTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}° {}' {:.2}\"",
            self.degrees.to_f64(),
            self.minutes.to_f64(),
            self.seconds.to_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_denominator_is_zero() {
        assert_eq!(Rational::new(0, 0).to_f64(), 0.0);
        assert_eq!(Rational::new(17, 0).to_f64(), 0.0);
        assert_eq!(SignedRational::new(-3, 0).to_f64(), 0.0);
    }

    #[test]
    fn test_to_f64() {
        assert_eq!(Rational::new(1, 4).to_f64(), 0.25);
        assert_eq!(SignedRational::new(-2, 3).to_f64(), -2.0 / 3.0);
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(Rational::from_f64(2.5), Rational::new(5, 2));
        assert_eq!(Rational::from_f64(-1.0), Rational::new(0, 1));
        assert_eq!(SignedRational::from_f64(-0.5), SignedRational::new(-1, 2));
        let big = Rational::from_f64(123_456.789);
        assert!((big.to_f64() - 123_456.789).abs() < 1e-3);
    }

    #[test]
    fn test_coordinate_triple_degrees() {
        let triple = CoordinateTriple::new(
            Rational::new(40, 1),
            Rational::new(26, 1),
            Rational::new(463, 10),
        );
        assert!((triple.to_degrees() - 40.446_194).abs() < 1e-4);

        let back = CoordinateTriple::from_degrees(-73.985_656);
        assert_eq!(back.degrees, Rational::new(73, 1));
        assert_eq!(back.minutes, Rational::new(59, 1));
        assert!((back.to_degrees() - 73.985_656).abs() < 1e-6);
    }
}

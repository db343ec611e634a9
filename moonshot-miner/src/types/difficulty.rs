//! Share difficulty and its target.

use std::fmt;

use bitcoin::Target;

use crate::u256::U256;

/// Difficulty-1 target: `0x00000000FFFF0000...0000`, the same value as
/// [`Target::MAX`].
///
/// A block hash must be at or below `MAX_TARGET / difficulty` to count as a
/// share.
pub const MAX_TARGET: U256 = U256 {
    high: 0x0000_0000_ffff_0000_0000_0000_0000_0000,
    low: 0,
};

/// Integer share difficulty as used for target computation.
///
/// Pools send difficulty as a JSON number which may be fractional or even
/// below one. It is coerced to at least 1 and floored, so the target is never
/// easier than [`MAX_TARGET`] and division is always by a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Difficulty(u64);

impl Difficulty {
    pub const ONE: Self = Self(1);

    /// Coerce a pool-supplied difficulty: `floor(max(1, value))`.
    ///
    /// NaN and negative values become 1; values beyond `u64::MAX` saturate.
    pub fn from_pool(value: f64) -> Self {
        if value.is_nan() || value < 1.0 {
            return Self::ONE;
        }
        // Float-to-int `as` saturates at u64::MAX.
        Self(value.floor() as u64)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// `MAX_TARGET / difficulty`, floored.
    pub fn to_target(self) -> Target {
        Target::from(MAX_TARGET / self.0)
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::ONE
    }
}

impl From<u64> for Difficulty {
    fn from(value: u64) -> Self {
        Self(value.max(1))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1.0, 1; "one")]
    #[test_case(0.5, 1; "fraction_below_one")]
    #[test_case(0.0, 1; "zero")]
    #[test_case(-3.0, 1; "negative")]
    #[test_case(f64::NAN, 1; "nan")]
    #[test_case(4.0, 4; "integer")]
    #[test_case(2.9, 2; "floored")]
    #[test_case(1e30, u64::MAX; "saturates")]
    fn test_from_pool(input: f64, expected: u64) {
        assert_eq!(Difficulty::from_pool(input).as_u64(), expected);
    }

    #[test]
    fn test_max_target_is_difficulty_one_target() {
        assert_eq!(Target::from(MAX_TARGET), Target::MAX);

        let bytes = Target::MAX.to_be_bytes();
        assert_eq!(&bytes[0..6], &[0x00, 0x00, 0x00, 0x00, 0xff, 0xff]);
        assert!(bytes[6..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_target_for_difficulty_one_and_below() {
        assert_eq!(Difficulty::from_pool(1.0).to_target(), Target::MAX);
        assert_eq!(Difficulty::from_pool(0.5).to_target(), Target::MAX);
    }

    #[test]
    fn test_target_divides_max_target() {
        assert_eq!(
            Difficulty::from_pool(4.0).to_target(),
            Target::from(MAX_TARGET / 4)
        );

        // MAX_TARGET / 2 == 0x000000007fff8000...
        let half = Difficulty::from_pool(2.0).to_target().to_be_bytes();
        assert_eq!(&half[0..6], &[0x00, 0x00, 0x00, 0x00, 0x7f, 0xff]);
        assert_eq!(half[6], 0x80);
        assert!(half[7..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_higher_difficulty_means_smaller_target() {
        let easy = Difficulty::from_pool(16.0).to_target();
        let hard = Difficulty::from_pool(65536.0).to_target();
        assert!(hard < easy);
        assert!(easy < Target::MAX);
    }

    #[test]
    fn test_from_u64_never_zero() {
        assert_eq!(Difficulty::from(0), Difficulty::ONE);
        assert_eq!(Difficulty::from(512).to_string(), "512");
    }
}

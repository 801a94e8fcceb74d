//! Strand handling and strand-aware coordinate mapping
//!
//! Chain target coordinates are expressed on the strand named in the chain
//! header. These helpers move positions and intervals between that local
//! space and absolute (plus-strand) target genome coordinates.

/// Strand orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Strand {
    #[default]
    Plus,
    Minus,
}

impl Strand {
    /// Parse strand from char
    ///
    /// # Examples
    /// ```
    /// use fast_chaindiff::core::Strand;
    /// assert_eq!(Strand::from_char('+'), Some(Strand::Plus));
    /// assert_eq!(Strand::from_char('-'), Some(Strand::Minus));
    /// assert_eq!(Strand::from_char('.'), None);
    /// ```
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Strand::Plus),
            '-' => Some(Strand::Minus),
            _ => None,
        }
    }

    /// Parse strand from a whole header field (`"+"` or `"-"`)
    pub fn from_field(field: &str) -> Option<Self> {
        match field {
            "+" => Some(Strand::Plus),
            "-" => Some(Strand::Minus),
            _ => None,
        }
    }

    /// Convert to char
    pub fn to_char(&self) -> char {
        match self {
            Strand::Plus => '+',
            Strand::Minus => '-',
        }
    }

    pub fn is_minus(&self) -> bool {
        matches!(self, Strand::Minus)
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// Map a local chain position to an absolute target position
///
/// Plus strand is the identity; minus strand maps `p` to `target_length - p`.
/// Returns `None` when a minus-strand position lies past `target_length`.
///
/// # Examples
/// ```
/// use fast_chaindiff::core::{map_position, Strand};
/// assert_eq!(map_position(Strand::Plus, 1000, 150), Some(150));
/// assert_eq!(map_position(Strand::Minus, 1000, 150), Some(850));
/// assert_eq!(map_position(Strand::Minus, 1000, 1001), None);
/// ```
#[inline]
pub fn map_position(strand: Strand, target_length: u64, pos: u64) -> Option<u64> {
    match strand {
        Strand::Plus => Some(pos),
        Strand::Minus => target_length.checked_sub(pos),
    }
}

/// Map a local half-open interval `[start, end)` to absolute target coordinates
///
/// Returns `None` when a minus-strand interval ends past `target_length`.
///
/// # Examples
/// ```
/// use fast_chaindiff::core::{map_interval, Strand};
/// assert_eq!(map_interval(Strand::Plus, 1000, 100, 200), Some((100, 200)));
/// assert_eq!(map_interval(Strand::Minus, 1000, 100, 200), Some((800, 900)));
/// assert_eq!(map_interval(Strand::Minus, 1000, 900, 1100), None);
/// ```
#[inline]
pub fn map_interval(strand: Strand, target_length: u64, start: u64, end: u64) -> Option<(u64, u64)> {
    match strand {
        Strand::Plus => Some((start, end)),
        Strand::Minus => Some((target_length.checked_sub(end)?, target_length.checked_sub(start)?)),
    }
}

//! DNA sequence utilities
//!
//! Complementing and case normalisation for fetched sequence windows.

/// Complement a single DNA base
///
/// Handles standard bases and IUPAC ambiguity codes in either case.
/// Anything else is returned unchanged.
#[inline]
pub fn complement_base(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        b'a' => b't',
        b't' => b'a',
        b'g' => b'c',
        b'c' => b'g',
        b'R' => b'Y',
        b'Y' => b'R',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        b'r' => b'y',
        b'y' => b'r',
        b'k' => b'm',
        b'm' => b'k',
        b'b' => b'v',
        b'v' => b'b',
        b'd' => b'h',
        b'h' => b'd',
        // S, W, N are self-complementary
        _ => base,
    }
}

/// Reverse-complement a window in place
pub fn revcomp_inplace(seq: &mut [u8]) {
    seq.reverse();
    for base in seq.iter_mut() {
        *base = complement_base(*base);
    }
}

/// Reverse complement as a new byte vector
///
/// # Examples
/// ```
/// use fast_chaindiff::core::dna::revcomp;
///
/// assert_eq!(revcomp(b"AACGT"), b"ACGTT".to_vec());
/// assert_eq!(revcomp(b""), Vec::<u8>::new());
/// ```
pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement_base(b)).collect()
}

/// Upper-case a window in place
#[inline]
pub fn normalize_case(seq: &mut [u8]) {
    seq.make_ascii_uppercase();
}

/// Case-insensitive base comparison
#[inline]
pub fn same_base(a: u8, b: u8) -> bool {
    a.eq_ignore_ascii_case(&b)
}

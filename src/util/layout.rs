//! Address and alignment arithmetic.

/// Align a value up to the given power-of-two alignment.
#[inline]
pub const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Padding needed to bring `value` up to `align`.
///
/// An alignment of zero means "no alignment" and yields no padding.
#[inline]
pub const fn padding_for(value: usize, align: usize) -> usize {
    if align == 0 {
        return 0;
    }
    align_up(value, align) - value
}

/// Whether `align` is usable as an alignment override (zero or a power of two).
#[inline]
pub const fn is_valid_alignment(align: usize) -> bool {
    align == 0 || align.is_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(9, 8), 16);
    }

    #[test]
    fn test_padding_for() {
        assert_eq!(padding_for(0, 8), 0);
        assert_eq!(padding_for(1, 8), 7);
        assert_eq!(padding_for(8, 8), 0);
        assert_eq!(padding_for(9, 8), 7);
        assert_eq!(padding_for(13, 0), 0);
    }

    #[test]
    fn test_valid_alignment() {
        assert!(is_valid_alignment(0));
        assert!(is_valid_alignment(1));
        assert!(is_valid_alignment(64));
        assert!(!is_valid_alignment(3));
        assert!(!is_valid_alignment(48));
    }
}

//! The arithmetic, logic and comparison primitives of the machine.
//!
//! Everything here is a pure function of two unsigned bytes. Arithmetic wraps
//! modulo 256, comparisons are unsigned.

pub fn add_bytes(a: u8, b: u8) -> u8 {
    a.wrapping_add(b)
}

pub fn sub_bytes(a: u8, b: u8) -> u8 {
    a.wrapping_sub(b)
}

pub fn mul_bytes(a: u8, b: u8) -> u8 {
    a.wrapping_mul(b)
}

/// Truncating division. `None` when `b == 0`.
pub fn div_bytes(a: u8, b: u8) -> Option<u8> {
    a.checked_div(b)
}

pub fn and_bytes(a: u8, b: u8) -> u8 {
    a & b
}

pub fn or_bytes(a: u8, b: u8) -> u8 {
    a | b
}

pub fn xor_bytes(a: u8, b: u8) -> u8 {
    a ^ b
}

// Branch predicates.

pub fn always(_a: u8, _b: u8) -> bool {
    true
}

pub fn equal(a: u8, b: u8) -> bool {
    a == b
}

pub fn not_equal(a: u8, b: u8) -> bool {
    a != b
}

pub fn less_than(a: u8, b: u8) -> bool {
    a < b
}

pub fn greater_or_equal(a: u8, b: u8) -> bool {
    a >= b
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn add_is_mod_256(a: u8, b: u8) {
            prop_assert_eq!(add_bytes(a, b) as u32, (a as u32 + b as u32) % 256);
        }

        #[test]
        fn sub_is_mod_256(a: u8, b: u8) {
            prop_assert_eq!(add_bytes(sub_bytes(a, b), b), a);
            prop_assert_eq!(sub_bytes(a, b) as i32, (a as i32 - b as i32).rem_euclid(256));
        }

        #[test]
        fn mul_is_mod_256(a: u8, b: u8) {
            prop_assert_eq!(mul_bytes(a, b) as u32, (a as u32 * b as u32) % 256);
        }

        #[test]
        fn div_truncates(a: u8, b in 1u8..=255) {
            prop_assert_eq!(div_bytes(a, b), Some(a / b));
        }

        #[test]
        fn div_by_zero_is_none(a: u8) {
            prop_assert_eq!(div_bytes(a, 0), None);
        }

        #[test]
        fn predicates_partition(a: u8, b: u8) {
            prop_assert!(always(a, b));
            prop_assert_ne!(equal(a, b), not_equal(a, b));
            prop_assert_ne!(less_than(a, b), greater_or_equal(a, b));
        }
    }

    #[test]
    fn test_scenario_values() {
        assert_eq!(add_bytes(200, 100), 44);
        assert_eq!(sub_bytes(0, 1), 255);
        assert_eq!(mul_bytes(16, 16), 0);
        assert_eq!(div_bytes(7, 2), Some(3));
        assert_eq!(and_bytes(0b1100, 0b1010), 0b1000);
        assert_eq!(or_bytes(0b1100, 0b1010), 0b1110);
        assert_eq!(xor_bytes(0b1100, 0b1010), 0b0110);
    }

    #[test]
    fn test_comparisons_are_unsigned() {
        // 0x80 would be negative as a signed byte.
        assert!(less_than(0x01, 0x80));
        assert!(greater_or_equal(0xff, 0x7f));
        assert!(greater_or_equal(5, 5));
        assert!(!less_than(5, 5));
    }
}

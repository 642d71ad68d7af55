//! Identifier sanitization and validation
//!
//! IMEIs are digit strings of 14-17 characters validated by the Luhn
//! checksum. Serials are vendor-format-agnostic: length bounds only, no
//! checksum. That asymmetry is policy, not an oversight.

const MIN_IMEI_LENGTH: usize = 14;
const MAX_IMEI_LENGTH: usize = 17;

pub const MIN_SERIAL_LENGTH: usize = 5;
pub const MAX_SERIAL_LENGTH: usize = 40;

/// Strip every non-digit character
pub fn sanitize_imei(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Trim and uppercase a serial
pub fn sanitize_serial(value: &str) -> String {
    value.trim().to_ascii_uppercase()
}

/// Mod-10 Luhn check: double every second digit from the right, subtract 9
/// from doubled values over 9, sum must divide by 10
pub fn passes_luhn(imei: &str) -> bool {
    if imei.is_empty() || !imei.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let mut sum = 0u32;
    let mut should_double = false;

    for c in imei.chars().rev() {
        let mut digit = c.to_digit(10).unwrap_or(0);

        if should_double {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }

        sum += digit;
        should_double = !should_double;
    }

    sum % 10 == 0
}

pub fn is_valid_imei(imei: &str) -> bool {
    if imei.is_empty() || imei.len() < MIN_IMEI_LENGTH || imei.len() > MAX_IMEI_LENGTH {
        return false;
    }

    imei.chars().all(|c| c.is_ascii_digit()) && passes_luhn(imei)
}

/// Length bounds only; serials carry no checksum
pub fn is_valid_serial(serial: &str) -> bool {
    let len = serial.len();
    len >= MIN_SERIAL_LENGTH && len <= MAX_SERIAL_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_imei_strips_non_digits() {
        assert_eq!(sanitize_imei("49-015420 323751x8"), "490154203237518");
        assert_eq!(sanitize_imei("no digits"), "");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for input in ["49-0154203237518", "  ab12cd  ", "490154203237518"] {
            let once = sanitize_imei(input);
            assert_eq!(sanitize_imei(&once), once);

            let once = sanitize_serial(input);
            assert_eq!(sanitize_serial(&once), once);
        }
    }

    #[test]
    fn known_luhn_vector() {
        assert!(is_valid_imei("490154203237518"));
        // Flip the check digit and it must fail
        assert!(!is_valid_imei("490154203237519"));
    }

    #[test]
    fn imei_length_bounds() {
        // 13 digits, too short even with a valid checksum
        assert!(!is_valid_imei("4901542032375"));
        // 18 digits, too long
        assert!(!is_valid_imei("490154203237518000"));
        assert!(!is_valid_imei(""));
    }

    #[test]
    fn luhn_rejects_non_digits() {
        assert!(!passes_luhn("49015420323751a"));
        assert!(!passes_luhn(""));
    }

    #[test]
    fn serial_rules_are_length_only() {
        assert!(is_valid_serial("F2LLD"));
        assert!(is_valid_serial("C02XK1ZGJGH5"));
        assert!(!is_valid_serial("AB12"));
        assert!(!is_valid_serial(&"X".repeat(41)));
        // No checksum: arbitrary content inside bounds passes
        assert!(is_valid_serial("!!!!!"));
    }

    #[test]
    fn sanitize_serial_uppercases() {
        assert_eq!(sanitize_serial("  c02xk1zgjgh5 "), "C02XK1ZGJGH5");
    }
}

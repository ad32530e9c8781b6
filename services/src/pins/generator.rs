use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// Number of decimal digits in a PIN.
pub const PIN_LENGTH: usize = 6;

/// How long a PIN stays valid after it is issued.
pub const PIN_TTL_MINUTES: i64 = 15;

/// Draws `PIN_LENGTH` independent uniform decimal digits.
///
/// Leading zeros are kept, so every value from `000000` to `999999` is
/// equally likely.
pub fn generate_pin_code<R: Rng>(rng: &mut R) -> String {
    (0..PIN_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

pub fn pin_expiry(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::minutes(PIN_TTL_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_pin_is_six_digits() {
        let mut rng = rand::thread_rng();
        for _ in 0..1_000 {
            let pin = generate_pin_code(&mut rng);
            assert_eq!(pin.len(), PIN_LENGTH);
            assert!(pin.chars().all(|c| c.is_ascii_digit()), "bad pin {pin}");
        }
    }

    #[test]
    fn test_leading_zeros_occur() {
        let mut rng = StdRng::seed_from_u64(7);
        // P(no leading zero in 1000 draws) = 0.9^1000
        let has_leading_zero = (0..1_000).any(|_| generate_pin_code(&mut rng).starts_with('0'));
        assert!(has_leading_zero);
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let first = generate_pin_code(&mut StdRng::seed_from_u64(42));
        let second = generate_pin_code(&mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn test_expiry_is_fifteen_minutes() {
        let created_at = Utc::now();
        assert_eq!(pin_expiry(created_at) - created_at, Duration::minutes(15));
    }
}

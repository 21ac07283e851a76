use rand::Rng;

/// Length of generated estimate names.
pub const ESTIMATE_NAME_LEN: usize = 10;

/// Random lowercase ASCII name for a new estimate.
///
/// Names are unique per project at the storage layer; a collision surfaces as
/// a conflict instead of being retried here.
pub fn generate_estimate_name() -> String {
    let mut rng = rand::rng();
    (0..ESTIMATE_NAME_LEN).map(|_| char::from(rng.random_range(b'a'..=b'z'))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_ten_lowercase_letters() {
        for _ in 0..32 {
            let name = generate_estimate_name();
            assert_eq!(name.len(), ESTIMATE_NAME_LEN);
            assert!(name.chars().all(|c| c.is_ascii_lowercase()));
        }
    }
}

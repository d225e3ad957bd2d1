use std::cmp::Ordering;

pub mod validation;

pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

pub fn weighted_mean(pairs: &[(f32, f32)]) -> Option<f32> {
    let mut weighted_sum = 0.0f64;
    let mut total_weight = 0.0f64;

    for &(value, weight) in pairs {
        weighted_sum += value as f64 * weight as f64;
        total_weight += weight as f64;
    }

    if total_weight > 0.0 {
        Some((weighted_sum / total_weight) as f32)
    } else {
        None
    }
}

// Score descending, then id ascending.
pub fn by_score_desc(a: &(u32, f32), b: &(u32, f32)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then(a.0.cmp(&b.0))
}

pub fn top_k(mut scored: Vec<(u32, f32)>, k: usize) -> Vec<(u32, f32)> {
    scored.sort_by(by_score_desc);
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_latin1() {
        assert_eq!(decode_latin1(b"Caf\xe9"), "Café");
        assert_eq!(decode_latin1(b"plain"), "plain");
    }

    #[test]
    fn test_weighted_mean() {
        let mean = weighted_mean(&[(4.0, 0.5), (2.0, 0.5)]).unwrap();
        assert!((mean - 3.0).abs() < 1e-6);

        let mean = weighted_mean(&[(5.0, 0.9), (1.0, 0.1)]).unwrap();
        assert!((mean - 4.6).abs() < 1e-6);

        assert_eq!(weighted_mean(&[(5.0, 0.0), (3.0, 0.0)]), None);
        assert_eq!(weighted_mean(&[]), None);
    }

    #[test]
    fn test_top_k_breaks_ties_by_id() {
        let scored = vec![(7, 0.5), (3, 0.9), (5, 0.5), (1, 0.2)];
        assert_eq!(top_k(scored, 3), vec![(3, 0.9), (5, 0.5), (7, 0.5)]);
    }
}

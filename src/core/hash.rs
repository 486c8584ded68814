/// The 32-bit multiplicative string hash used to assign a document to a shard:
/// `h = (h << 5) - h + codepoint`, i.e. `h = h * 31 + codepoint`, folded to `i32`
/// and taken absolute before the final `mod N`.
pub fn shard_hash(key: &str) -> u32 {
    let mut h: i32 = 0;
    for c in key.chars() {
        h = h.wrapping_shl(5).wrapping_sub(h).wrapping_add(c as i32);
    }
    h.unsigned_abs()
}

pub fn shard_of(key: &str, num_shards: usize) -> usize {
    if num_shards <= 1 {
        return 0;
    }
    (shard_hash(key) as usize) % num_shards
}

/// Levenshtein edit distance between two strings, counted in chars.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());

    if n == 0 {
        return m;
    }
    if m == 0 {
        return n;
    }

    let mut prev: Vec<usize> = (0..=m).collect();
    let mut curr = vec![0usize; m + 1];

    for i in 1..=n {
        curr[0] = i;
        for j in 1..=m {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[m]
}

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two (lat, lon) points in kilometers.
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = a;
    let (lat2, lon2) = b;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();

    let sin_lat = (d_lat / 2.0).sin();
    let sin_lon = (d_lon / 2.0).sin();
    let h = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lon * sin_lon;

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_is_deterministic() {
        let s1 = shard_of("doc-42", 8);
        let s2 = shard_of("doc-42", 8);
        assert_eq!(s1, s2);
    }

    #[test]
    fn single_shard_is_always_zero() {
        assert_eq!(shard_of("anything", 1), 0);
    }

    #[test]
    fn levenshtein_basic() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
    }

    #[test]
    fn haversine_known_points() {
        // New York to Los Angeles, roughly 3936 km.
        let ny = (40.7128, -74.0060);
        let la = (34.0522, -118.2437);
        let d = haversine_km(ny, la);
        assert!((3900.0..4000.0).contains(&d), "got {d}");
    }

    #[test]
    fn haversine_same_point_is_zero() {
        let p = (40.7128, -74.0060);
        assert!(haversine_km(p, p) < 1e-9);
    }
}

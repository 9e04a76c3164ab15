//! Fuzzy text similarity used to pick the right table row.

/// Minimum score a candidate row must exceed to be accepted.
///
/// Tuned by hand; not a provable disambiguator.
pub const SIMILARITY_THRESHOLD: f64 = 0.5;

/// Score two strings in `[0, 1]`.
///
/// Both sides are compared without whitespace and lower-cased:
/// - identical => 1.0
/// - one contains the other => shorter / longer
/// - otherwise => LCS length / longer length
///
/// Empty input scores 0.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let s1 = squash(a);
    let s2 = squash(b);
    if s1.is_empty() || s2.is_empty() {
        return 0.0;
    }
    if s1 == s2 {
        return 1.0;
    }

    let (n1, n2) = (s1.chars().count(), s2.chars().count());
    if s1.contains(s2.as_str()) {
        return n2 as f64 / n1 as f64;
    }
    if s2.contains(s1.as_str()) {
        return n1 as f64 / n2 as f64;
    }

    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();
    longest_common_subsequence(&a, &b) as f64 / n1.max(n2) as f64
}

/// Length of the longest common subsequence of `a` and `b`
pub fn longest_common_subsequence<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // Two rolling rows of the DP table
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn squash(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_ignoring_space_and_case() {
        assert_eq!(similarity("Hello World", "helloworld"), 1.0);
    }

    #[test]
    fn test_containment_ratio() {
        assert_eq!(similarity("abcdef", "abc"), 0.5);
        assert_eq!(similarity("abc", "abcdef"), 0.5);
    }

    #[test]
    fn test_disjoint_strings() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_lcs_ratio() {
        // LCS("abcd", "axcy") = "ac"
        assert_eq!(similarity("abcd", "axcy"), 0.5);
        assert_eq!(similarity("", "abc"), 0.0);
        assert_eq!(similarity("   ", "abc"), 0.0);
    }

    #[test]
    fn test_longest_common_subsequence() {
        let a: Vec<char> = "AGGTAB".chars().collect();
        let b: Vec<char> = "GXTXAYB".chars().collect();
        assert_eq!(longest_common_subsequence(&a, &b), 4);
        assert_eq!(longest_common_subsequence::<char>(&[], &b), 0);
    }

    #[test]
    fn test_threshold_is_strict() {
        assert!(!(similarity("abcdef", "abc") > SIMILARITY_THRESHOLD));
    }
}

//! String similarity measures used by fuzzy ranking
//!
//! All functions return a value in `0.0..=1.0` where 1.0 means identical. Inputs are
//! compared as given; callers lowercase beforehand.

use std::collections::HashSet;

/// Edit distance between two strings, counted in chars
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev_row: Vec<usize> = (0..=b.len()).collect();
    let mut curr_row = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr_row[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr_row[j] = (prev_row[j] + 1).min(curr_row[j - 1] + 1).min(prev_row[j - 1] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b.len()]
}

/// `1 - distance / max_len`
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(a, b) as f64 / max_len as f64
}

/// Jaro similarity
pub fn jaro(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, &ca) in a.iter().enumerate() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(b.len());
        for j in start..end {
            if !b_matched[j] && b[j] == ca {
                a_matched[i] = true;
                b_matched[j] = true;
                matches += 1;
                break;
            }
        }
    }

    if matches == 0 {
        return 0.0;
    }

    // Half the number of matched chars that appear in a different order
    let a_seq = a.iter().zip(&a_matched).filter(|(_, m)| **m).map(|(c, _)| c);
    let b_seq = b.iter().zip(&b_matched).filter(|(_, m)| **m).map(|(c, _)| c);
    let transpositions = a_seq.zip(b_seq).filter(|(x, y)| x != y).count() / 2;

    let m = matches as f64;
    (m / a.len() as f64 + m / b.len() as f64 + (m - transpositions as f64) / m) / 3.0
}

/// Jaro-Winkler similarity (prefix scale 0.1, prefix capped at 4 chars)
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    let jaro = jaro(a, b);
    let prefix = a.chars().zip(b.chars()).take(4).take_while(|(x, y)| x == y).count();
    jaro + prefix as f64 * 0.1 * (1.0 - jaro)
}

/// Jaccard index of the token sets of both strings
///
/// Tokens are split on whitespace, `.`, `_` and `-`. Two strings without any tokens
/// score 0.
pub fn token_jaccard(a: &str, b: &str) -> f64 {
    let a = tokens(a);
    let b = tokens(b);
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// Best of the three measures
pub fn combined_similarity(a: &str, b: &str) -> f64 {
    levenshtein_similarity(a, b).max(jaro_winkler(a, b)).max(token_jaccard(a, b))
}

fn tokens(text: &str) -> HashSet<&str> {
    text.split(|c: char| c.is_whitespace() || matches!(c, '.' | '_' | '-'))
        .filter(|token| !token.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-3, "expected {expected}, got {actual}");
    }

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
        assert_eq!(levenshtein_distance("café", "cafe"), 1);
    }

    #[test]
    fn test_levenshtein_similarity() {
        approx(levenshtein_similarity("readme", "readme"), 1.0);
        approx(levenshtein_similarity("kitten", "sitting"), 1.0 - 3.0 / 7.0);
    }

    #[test]
    fn test_jaro_reference_values() {
        approx(jaro("martha", "marhta"), 0.944);
        approx(jaro("dixon", "dicksonx"), 0.767);
        approx(jaro("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_jaro_winkler_reference_values() {
        approx(jaro_winkler("martha", "marhta"), 0.961);
        approx(jaro_winkler("dwayne", "duane"), 0.84);
        approx(jaro_winkler("dixon", "dicksonx"), 0.813);
    }

    #[test]
    fn test_token_jaccard() {
        approx(token_jaccard("annual report", "report_annual.pdf"), 2.0 / 3.0);
        approx(token_jaccard("", ""), 0.0);
        approx(token_jaccard("alpha", "beta"), 0.0);
    }

    #[test]
    fn test_combined_takes_maximum() {
        let a = "rpeort";
        let b = "report";
        let combined = combined_similarity(a, b);
        assert!(combined >= levenshtein_similarity(a, b));
        assert!(combined >= jaro_winkler(a, b));
        assert!(combined <= 1.0);
    }
}

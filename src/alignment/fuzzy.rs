/*!
 * Fuzzy token matching.
 *
 * Levenshtein-based similarity used when a segment token and a transcript
 * token differ by a recognition error or a spelling variant.
 */

/// Fuzzy matcher using normalized Levenshtein distance
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    /// Default threshold for fuzzy matching (0.0-1.0, higher = stricter)
    default_threshold: f32,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self {
            default_threshold: 0.8,
        }
    }
}

impl FuzzyMatcher {
    /// Create a new fuzzy matcher with custom threshold
    pub fn new(threshold: f32) -> Self {
        Self {
            default_threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.default_threshold
    }

    /// Check if two tokens are similar enough to be treated as the same word
    pub fn matches(&self, a: &str, b: &str) -> bool {
        self.similarity(a, b) >= self.default_threshold
    }

    /// Similarity between two strings (0.0-1.0), counted in characters
    pub fn similarity(&self, a: &str, b: &str) -> f32 {
        similarity(a, b)
    }

    /// Best candidate at or above the threshold, with its index and score
    pub fn find_best_match<'a, I>(&self, text: &str, candidates: I) -> Option<(usize, f32)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        candidates
            .into_iter()
            .enumerate()
            .map(|(i, candidate)| (i, self.similarity(text, candidate)))
            .filter(|(_, score)| *score >= self.default_threshold)
            .fold(None, |best: Option<(usize, f32)>, current| match best {
                Some(b) if b.1 >= current.1 => Some(b),
                _ => Some(current),
            })
    }
}

/// Normalized Levenshtein similarity of two strings
pub fn similarity(a: &str, b: &str) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();

    let distance = levenshtein_distance(&a_lower, &b_lower);
    let max_len = a_lower.chars().count().max(b_lower.chars().count());

    1.0 - (distance as f32 / max_len as f32)
}

/// Levenshtein distance between two strings
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Two-row table
    let mut prev_row: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr_row: Vec<usize> = vec![0; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_chars.len()]
}

//! Text and vector similarity measures

/// Lowercase, split on non-alphanumerics, sort and rejoin tokens
pub fn token_sort(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Sørensen–Dice coefficient over character bigrams of token-sorted text.
///
/// Scores lie in `[0, 1]`. A one-word query against a longer blob is
/// diluted by the blob's other tags, so useful cutoffs sit around `0.3`.
pub fn dice(query: &str, blob: &str) -> f64 {
    let query = token_sort(query);
    let blob = token_sort(blob);
    if query.is_empty() || blob.is_empty() {
        return 0.0;
    }
    strsim::sorensen_dice(&query, &blob)
}

/// Best normalized Levenshtein similarity between the shorter string and any
/// equally long window of the longer one.
///
/// Containment scores `1.0` regardless of what surrounds it, so this metric
/// needs a much higher cutoff than [`dice`].
pub fn partial(query: &str, blob: &str) -> f64 {
    let query = query.trim().to_lowercase();
    let blob = blob.trim().to_lowercase();
    if query.is_empty() || blob.is_empty() {
        return 0.0;
    }

    let (short, long) = if query.chars().count() <= blob.chars().count() {
        (query, blob)
    } else {
        (blob, query)
    };

    let long_chars: Vec<char> = long.chars().collect();
    let width = short.chars().count();
    let mut best = 0.0_f64;
    for start in 0..=(long_chars.len() - width) {
        let window: String = long_chars[start..start + width].iter().collect();
        let score = strsim::normalized_levenshtein(&short, &window);
        if score > best {
            best = score;
            if best >= 1.0 {
                break;
            }
        }
    }
    best
}

/// Cosine similarity; `0.0` for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

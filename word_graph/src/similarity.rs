//! Shared fuzzy text utilities.

/// Edit distance between two strings, by characters.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut previous_diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous_diagonal + usize::from(ca != cb);
            previous_diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(row[j + 1] + 1);
        }
    }
    row[b.len()]
}

/// Lowercase `text` with the Turkish dotted/dotless i rule: `İ` folds to
/// `i` and `I` to `ı`, which plain Unicode lowercasing gets wrong for
/// Turkish ("AYNI" must fold to "aynı", not "ayni").
pub fn fold_turkish(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'İ' => out.push('i'),
            'I' => out.push('ı'),
            _ => out.extend(c.to_lowercase()),
        }
    }
    out
}

/// Normalized Levenshtein similarity in [0, 1], case-insensitive with the
/// Turkish fold.
///
/// `1 - distance / max(len)`; two empty strings are identical (1.0).
pub fn word_similarity(a: &str, b: &str) -> f32 {
    let a = fold_turkish(a);
    let b = fold_turkish(b);
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f32 / max_len as f32
}

/// Case-insensitive whole-word substring check: `needle` must appear in
/// `haystack` with non-alphanumeric (or edge) boundaries on both sides.
pub fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    let haystack = haystack.to_lowercase();
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }

    let mut start = 0;
    while let Some(pos) = haystack[start..].find(&needle) {
        let begin = start + pos;
        let end = begin + needle.len();
        let left_ok = haystack[..begin]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let right_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if left_ok && right_ok {
            return true;
        }
        start = end;
    }
    false
}

/// Lowercased whitespace tokens of a text.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Jaccard overlap of the two texts' token sets, in [0, 1].
pub fn token_jaccard(a: &str, b: &str) -> f32 {
    use std::collections::HashSet;
    let a: HashSet<String> = tokenize(a).into_iter().collect();
    let b: HashSet<String> = tokenize(b).into_iter().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    intersection as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_basics() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("kedi", "kedi"), 0);
        assert_eq!(levenshtein("kedi", "keçi"), 1);
        assert_eq!(levenshtein("kitap", "kitaplık"), 3);
    }

    #[test]
    fn test_turkish_fold() {
        assert_eq!(fold_turkish("AYNI"), "aynı");
        assert_eq!(fold_turkish("KEDİ"), "kedi");
        assert_eq!(fold_turkish("İstanbul"), "istanbul");
        assert_eq!(fold_turkish("Işık"), "ışık");
        assert_eq!(fold_turkish("merhaba"), "merhaba");
    }

    #[test]
    fn test_similarity_folds_dotless_i() {
        assert_eq!(word_similarity("aynı", "AYNI"), 1.0);
        assert_eq!(word_similarity("ılık", "ILIK"), 1.0);
    }

    #[test]
    fn test_similarity_symmetry() {
        let cases = [
            ("merhaba", "merhab"),
            ("ankara", "ANKARA"),
            ("", "dolu"),
            ("başkent", "başka"),
        ];
        for (a, b) in cases {
            assert_eq!(word_similarity(a, b), word_similarity(b, a));
        }
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(word_similarity("", ""), 1.0);
        assert_eq!(word_similarity("aynı", "AYNI"), 1.0);
        assert_eq!(word_similarity("abc", "xyz"), 0.0);
        let s = word_similarity("merhaba", "merhab");
        assert!(s > 0.7 && s < 1.0);
    }

    #[test]
    fn test_contains_whole_word() {
        assert!(contains_whole_word("Ankara çok güzel", "ankara"));
        assert!(contains_whole_word("Başkent: Ankara.", "ankara"));
        assert!(!contains_whole_word("Ankaralılar geldi", "ankara"));
        assert!(!contains_whole_word("hiçbir şey", "ankara"));
    }

    #[test]
    fn test_tokenize_strips_punctuation() {
        assert_eq!(tokenize("Merhaba, dünya!"), vec!["merhaba", "dünya"]);
        assert_eq!(tokenize("  "), Vec::<String>::new());
    }

    #[test]
    fn test_token_jaccard() {
        assert_eq!(token_jaccard("bir iki", "bir iki"), 1.0);
        assert_eq!(token_jaccard("bir", "iki"), 0.0);
        let j = token_jaccard("bir iki üç", "iki üç dört");
        assert!((j - 0.5).abs() < 0.001);
    }
}

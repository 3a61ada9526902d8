//! Key Pattern Module
//!
//! Glob matching with the same syntax the store uses for key enumeration.

/// Returns true when `key` matches the glob `pattern`.
///
/// Supported syntax:
/// - `*` any sequence, `?` any single character
/// - `[abc]`, `[a-z]`, `[^a]` character classes
/// - `\x` matches `x` literally
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();
    match_from(&pattern, &key)
}

fn match_from(pattern: &[char], key: &[char]) -> bool {
    let (mut p, mut k) = (0, 0);
    // Position to resume from after the last `*`
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        let step = match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, k));
                p += 1;
                continue;
            }
            Some('?') => Some(p + 1),
            Some('[') => match_class(pattern, p, key[k]),
            Some('\\') if p + 1 < pattern.len() => {
                (pattern[p + 1] == key[k]).then_some(p + 2)
            }
            Some(&c) => (c == key[k]).then_some(p + 1),
            None => None,
        };

        match step {
            Some(next) => {
                p = next;
                k += 1;
            }
            None => match backtrack {
                Some((star, consumed)) => {
                    p = star + 1;
                    k = consumed + 1;
                    backtrack = Some((star, consumed + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Matches `c` against the class opening at `pattern[start]`.
///
/// Returns the index after the class on success. An unterminated class
/// matches a literal `[`.
fn match_class(pattern: &[char], start: usize, c: char) -> Option<usize> {
    let mut i = start + 1;
    let negated = pattern.get(i) == Some(&'^');
    if negated {
        i += 1;
    }

    let mut matched = false;
    loop {
        match pattern.get(i) {
            None => return (c == '[').then_some(start + 1),
            Some(']') => break,
            Some('\\') if i + 1 < pattern.len() => {
                matched |= pattern[i + 1] == c;
                i += 2;
            }
            Some(&low) if pattern.get(i + 1) == Some(&'-') && i + 2 < pattern.len() && pattern[i + 2] != ']' => {
                let high = pattern[i + 2];
                let (low, high) = if low <= high { (low, high) } else { (high, low) };
                matched |= low <= c && c <= high;
                i += 3;
            }
            Some(&single) => {
                matched |= single == c;
                i += 1;
            }
        }
    }

    (matched != negated).then_some(i + 1)
}

//! Redis-style glob matching for key patterns.
//!
//! Supported syntax: `*` (any run), `?` (one char), `[abc]`, `[a-z]`,
//! `[^x]` and `\` to escape the next character.

/// Returns whether `text` matches `pattern`.
#[must_use]
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    // (pattern index of the last '*', text index it currently absorbs up to)
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() {
            if p[pi] == '*' {
                backtrack = Some((pi, ti));
                pi += 1;
                continue;
            }
            let (matched, next) = match_token(&p, pi, t[ti]);
            if matched {
                pi = next;
                ti += 1;
                continue;
            }
        }
        match backtrack {
            Some((star, absorbed)) => {
                backtrack = Some((star, absorbed + 1));
                pi = star + 1;
                ti = absorbed + 1;
            }
            None => return false,
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// Matches one non-`*` token at `p[pi]` against `c`; returns the match and
/// the index just past the token.
fn match_token(p: &[char], pi: usize, c: char) -> (bool, usize) {
    match p[pi] {
        '?' => (true, pi + 1),
        '\\' if pi + 1 < p.len() => (p[pi + 1] == c, pi + 2),
        '[' => match_class(p, pi, c),
        literal => (literal == c, pi + 1),
    }
}

fn match_class(p: &[char], start: usize, c: char) -> (bool, usize) {
    let mut i = start + 1;
    let negate = i < p.len() && p[i] == '^';
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < p.len() && p[i] != ']' {
        if p[i] == '\\' && i + 1 < p.len() {
            matched |= p[i + 1] == c;
            i += 2;
        } else if i + 2 < p.len() && p[i + 1] == '-' && p[i + 2] != ']' {
            let (lo, hi) = if p[i] <= p[i + 2] {
                (p[i], p[i + 2])
            } else {
                (p[i + 2], p[i])
            };
            matched |= lo <= c && c <= hi;
            i += 3;
        } else {
            matched |= p[i] == c;
            i += 1;
        }
    }

    // an unterminated class runs to the end of the pattern
    let next = if i < p.len() { i + 1 } else { i };
    (matched != negate, next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_star() {
        assert!(glob_match("user:42*", "user:42:a"));
        assert!(glob_match("user:42*", "user:42"));
        assert!(glob_match("user:42*", "user:421"));
        assert!(!glob_match("user:42*", "user:99:a"));
    }

    #[test]
    fn test_star_in_middle() {
        assert!(glob_match("user:*:7", "user:id:7"));
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(!glob_match("a*b*c", "axxbyy"));
        assert!(glob_match("*", ""));
        assert!(glob_match("**", "anything"));
    }

    #[test]
    fn test_question_mark() {
        assert!(glob_match("h?llo", "hello"));
        assert!(!glob_match("h?llo", "hllo"));
    }

    #[test]
    fn test_classes() {
        assert!(glob_match("h[ae]llo", "hallo"));
        assert!(!glob_match("h[ae]llo", "hillo"));
        assert!(glob_match("h[^e]llo", "hallo"));
        assert!(!glob_match("h[^e]llo", "hello"));
        assert!(glob_match("file:[0-9]", "file:5"));
        assert!(!glob_match("file:[0-9]", "file:x"));
    }

    #[test]
    fn test_escape() {
        assert!(glob_match(r"what\?", "what?"));
        assert!(!glob_match(r"what\?", "whatx"));
        assert!(glob_match(r"a\*", "a*"));
        assert!(!glob_match(r"a\*", "ab"));
    }

    #[test]
    fn test_exact() {
        assert!(glob_match("user:find-all", "user:find-all"));
        assert!(!glob_match("user:find-all", "user:find-all:2"));
        assert!(!glob_match("", "x"));
    }
}

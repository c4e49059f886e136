use std::collections::HashMap;

/// Split a passage into lowercase ASCII alphanumeric tokens
///
/// A token is a maximal run of bytes that are either ASCII alphanumeric
/// or above 127. ASCII uppercase is folded to lowercase. A token
/// containing any byte above 127 is dropped whole, so `café cat` yields
/// only `cat`. Empty tokens are never emitted.
///
/// The input is raw bytes: the collection is UTF-8-agnostic and only the
/// ASCII subset survives tokenization.
pub fn tokenize(passage: &[u8]) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut non_ascii = false;

    for &byte in passage {
        if byte.is_ascii_alphanumeric() {
            current.push(byte.to_ascii_lowercase() as char);
        } else if byte > 127 {
            non_ascii = true;
        } else {
            flush_token(&mut tokens, &mut current, &mut non_ascii);
        }
    }
    flush_token(&mut tokens, &mut current, &mut non_ascii);

    tokens
}

fn flush_token(tokens: &mut Vec<String>, current: &mut String, non_ascii: &mut bool) {
    if !current.is_empty() && !*non_ascii {
        tokens.push(std::mem::take(current));
    } else {
        current.clear();
    }
    *non_ascii = false;
}

/// Compute term frequencies for one passage
pub fn term_frequencies(passage: &[u8]) -> HashMap<String, u32> {
    let mut freqs = HashMap::new();
    for token in tokenize(passage) {
        *freqs.entry(token).or_insert(0) += 1;
    }
    freqs
}

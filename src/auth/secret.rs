//! Random credentials for modes started without an explicit secret.

use rand::seq::SliceRandom;
use rand::Rng;

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const PASSWORD_SYMBOLS: &[u8] = b"!#%&*+-=?@^_";
const TOKEN_SYMBOLS: &[u8] = b"-_.~";

pub const PASSWORD_LEN: usize = 16;
pub const TOKEN_LEN: usize = 32;

/// A 16-character password with at least one lowercase letter, one uppercase
/// letter, one digit and one symbol. `:` is never used, since Basic auth splits
/// on it.
pub fn generate_password() -> String {
    generate(PASSWORD_LEN, &[LOWER, UPPER, DIGITS, PASSWORD_SYMBOLS])
}

/// A 32-character URL-safe token. Symbols are limited to the RFC 3986
/// unreserved set so the token survives `?token=` without escaping.
pub fn generate_token() -> String {
    generate(TOKEN_LEN, &[LOWER, UPPER, DIGITS, TOKEN_SYMBOLS])
}

/// Draw one character from each class, fill the rest from the union of all
/// classes, then shuffle.
fn generate(len: usize, classes: &[&[u8]]) -> String {
    let mut rng = rand::rng();
    let alphabet: Vec<u8> = classes.iter().flat_map(|c| c.iter().copied()).collect();

    let mut out: Vec<u8> = Vec::with_capacity(len);
    for class in classes {
        out.push(class[rng.random_range(0..class.len())]);
    }
    while out.len() < len {
        out.push(alphabet[rng.random_range(0..alphabet.len())]);
    }
    out.shuffle(&mut rng);

    out.into_iter().map(char::from).collect()
}

//! Pairing-phrase and password inputs.

use lnc_core::{LncError, LncResult};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Number of words in an LNC pairing phrase.
pub const PAIRING_PHRASE_WORDS: usize = 10;

/// A validated ten-word pairing phrase.
///
/// Tokens are split on any run of whitespace, so leading, trailing and
/// repeated separators are ignored. Words are case-sensitive and carry no
/// charset check here; the relay rejects words it does not know.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PairingPhrase {
    words: Vec<String>,
}

impl PairingPhrase {
    pub fn parse(raw: &str) -> LncResult<Self> {
        let words: Vec<String> = raw.split_whitespace().map(str::to_owned).collect();
        if words.len() != PAIRING_PHRASE_WORDS {
            let count = words.len();
            drop(Zeroizing::new(words));
            return Err(LncError::InvalidPairingPhrase(format!(
                "pairingPhrase must contain exactly {} words, got {}",
                PAIRING_PHRASE_WORDS, count
            )));
        }
        Ok(Self { words })
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    /// Single-space joined phrase, as the relay library expects it.
    pub fn normalized(&self) -> Zeroizing<String> {
        Zeroizing::new(self.words.join(" "))
    }
}

impl fmt::Debug for PairingPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairingPhrase([{} words redacted])", self.words.len())
    }
}

/// The password paired with a pairing phrase. Opaque beyond being present.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Password(String);

impl Password {
    pub fn new(raw: impl Into<String>) -> LncResult<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(LncError::InvalidArgument("password is required".into()));
        }
        Ok(Self(raw))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([redacted])")
    }
}

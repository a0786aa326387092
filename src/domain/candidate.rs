//! Token Candidates
//!
//! A candidate is one token/pool pair surfaced by the listing step of a scan
//! cycle. It is created fresh every cycle and only survives past the cycle
//! through its [`CandidateKey`] in the cooldown store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Figures returned alongside the listing itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingSnapshot {
    /// Token name
    pub name: String,
    /// Token symbol
    pub symbol: String,
    /// Token logo (used as the alert image reference)
    pub logo_url: Option<String>,
    /// Price in USD at listing time
    pub price_usd: f64,
    /// Pool liquidity in USD
    pub liquidity_usd: f64,
    /// Fully diluted valuation in USD
    pub fdv_usd: f64,
}

/// Token/pool pair under consideration for one scan cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenCandidate {
    /// Chain identifier (e.g. "solana")
    pub chain: String,
    /// Token mint address
    pub token_address: String,
    /// Pool (pair) address
    pub pool_address: String,
    /// When the listing step surfaced this candidate (Unix seconds)
    pub discovered_at: u64,
    /// Listing figures
    pub listing: ListingSnapshot,
}

impl TokenCandidate {
    pub fn new(
        chain: impl Into<String>,
        token_address: impl Into<String>,
        pool_address: impl Into<String>,
        discovered_at: u64,
    ) -> Self {
        Self {
            chain: chain.into(),
            token_address: token_address.into(),
            pool_address: pool_address.into(),
            discovered_at,
            listing: ListingSnapshot::default(),
        }
    }

    pub fn with_listing(mut self, listing: ListingSnapshot) -> Self {
        self.listing = listing;
        self
    }

    /// Cooldown key for this candidate
    pub fn key(&self) -> CandidateKey {
        CandidateKey::new(&self.chain, &self.token_address, &self.pool_address)
    }
}

/// Identity of a candidate across cycles: (chain, token, pool)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateKey {
    pub chain: String,
    pub token: String,
    pub pool: String,
}

impl CandidateKey {
    pub fn new(chain: &str, token: &str, pool: &str) -> Self {
        Self {
            chain: chain.to_string(),
            token: token.to_string(),
            pool: pool.to_string(),
        }
    }
}

impl fmt::Display for CandidateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.chain, self.token, self.pool)
    }
}

/// Check that an address is base58 and decodes to a 32-byte public key
pub fn is_valid_address(address: &str) -> bool {
    bs58::decode(address)
        .into_vec()
        .map(|bytes| bytes.len() == 32)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WSOL: &str = "So11111111111111111111111111111111111111112";

    #[test]
    fn test_key_identity() {
        let a = TokenCandidate::new("solana", "tokenA", "poolA", 100);
        let b = TokenCandidate::new("solana", "tokenA", "poolA", 200);
        let c = TokenCandidate::new("solana", "tokenA", "poolB", 100);

        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_key_display() {
        let key = CandidateKey::new("solana", "mint", "pool");
        assert_eq!(key.to_string(), "solana:mint:pool");
    }

    #[test]
    fn test_address_validation() {
        assert!(is_valid_address(WSOL));
        assert!(!is_valid_address("not-base58-0OIl"));
        assert!(!is_valid_address("abc"));
        assert!(!is_valid_address(""));
    }
}

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Token {
    address: Address,
    symbol: String,
    decimals: u8,
}

pub type TokenWrapper = Arc<Token>;

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
        self.symbol.hash(state);
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.symbol == other.symbol
    }
}

impl Eq for Token {}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.symbol.cmp(&other.symbol).then_with(|| self.address.cmp(&other.address))
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Token {
    pub fn new(address: Address, symbol: &str, decimals: u8) -> Token {
        Token { address, symbol: normalize_symbol(symbol), decimals }
    }

    // For testing purposes
    pub fn random(symbol: &str) -> Token {
        Token::new(Address::random(), symbol, 18)
    }

    pub fn get_symbol(&self) -> &str {
        &self.symbol
    }

    pub fn get_decimals(&self) -> u8 {
        self.decimals
    }

    pub fn get_address(&self) -> Address {
        self.address
    }

    pub fn is_symbol(&self, symbol: &str) -> bool {
        self.symbol == normalize_symbol(symbol)
    }
}

/// Symbols are the token identity across chains, so they are compared trimmed and upper-cased.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

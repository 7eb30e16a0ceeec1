//! Account Address
//!
//! 32-byte ledger account identity, kept in its canonical long hex form
//! (`0x` + 64 lowercase hex digits) so that equality is textual.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::entity::{DomainError, DomainResult};

const HEX_LEN: usize = 64;

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(0x)?[0-9a-fA-F]{1,64}$").expect("valid address regex"))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountAddress(String);

impl AccountAddress {
    /// Parse short (`0x1`) or long form, with or without the `0x` prefix
    pub fn parse(input: &str) -> DomainResult<Self> {
        let trimmed = input.trim();
        if !address_pattern().is_match(trimmed) {
            return Err(DomainError::InvalidInput(format!(
                "not an account address: {:?}",
                input
            )));
        }
        let digits = trimmed.trim_start_matches("0x").to_ascii_lowercase();
        Ok(Self(format!("0x{:0>width$}", digits, width = HEX_LEN)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x5448...a4f78` style label for list rows
    pub fn abbreviated(&self) -> String {
        let s = &self.0;
        format!("{}...{}", &s[..6], &s[s.len() - 5..])
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountAddress {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for AccountAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AccountAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_form_is_padded() {
        let addr = AccountAddress::parse("0x1").unwrap();
        assert_eq!(addr.as_str().len(), 66);
        assert!(addr.as_str().ends_with("01"));
        assert_eq!(addr, AccountAddress::parse("1").unwrap());
    }

    #[test]
    fn test_case_is_normalized() {
        let upper = AccountAddress::parse("0xABCDEF").unwrap();
        let lower = AccountAddress::parse("0xabcdef").unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(AccountAddress::parse("0xnothex").is_err());
        assert!(AccountAddress::parse("").is_err());
        assert!(AccountAddress::parse(&format!("0x{}", "a".repeat(65))).is_err());
    }

    #[test]
    fn test_abbreviated() {
        let addr = AccountAddress::parse(
            "0x5448e45d5c73f4f44a91fe9bb11748e11e79153b4e4b658287c3f901d2ca4f78",
        )
        .unwrap();
        assert_eq!(addr.abbreviated(), "0x5448...a4f78");
    }
}

//! Wallet positions, balances, and keyed position sets
//!
//! Positions arrive as loosely-typed JSON records (from the wallet data API or
//! from a model's target allocation). Records are validated into typed values
//! here so that everything downstream can assume well-formed input.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Role of a position inside a lending market
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObligationType {
    Supply,
    Borrow,
    /// Any other label reported by a protocol, kept verbatim
    Other(String),
}

impl ObligationType {
    pub fn as_str(&self) -> &str {
        match self {
            ObligationType::Supply => "Supply",
            ObligationType::Borrow => "Borrow",
            ObligationType::Other(label) => label,
        }
    }
}

impl FromStr for ObligationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::MalformedPosition(
                "obligation_type must not be empty".to_string(),
            ));
        }
        Ok(match trimmed.to_ascii_lowercase().as_str() {
            "supply" => ObligationType::Supply,
            "borrow" => ObligationType::Borrow,
            _ => ObligationType::Other(trimmed.to_string()),
        })
    }
}

impl fmt::Display for ObligationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ObligationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ObligationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Amount as it appears on the wire: either a decimal string or a JSON number
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountField {
    Text(String),
    Number(serde_json::Number),
}

impl AmountField {
    fn parse(&self) -> Option<Decimal> {
        let raw = match self {
            AmountField::Text(text) => text.trim().to_string(),
            AmountField::Number(number) => number.to_string(),
        };
        Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .ok()
    }
}

/// Raw position record, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PositionRecord {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, alias = "protocol")]
    pub protocol_name: Option<String>,
    #[serde(default, alias = "market")]
    pub market_name: Option<String>,
    #[serde(default)]
    pub amount: Option<AmountField>,
    #[serde(default)]
    pub obligation_type: Option<String>,
}

/// Raw balance record, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BalanceRecord {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub amount: Option<AmountField>,
}

/// Identity of a position. At most one position per key in any set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey {
    pub symbol: String,
    pub protocol: String,
    pub market: String,
    pub obligation_type: ObligationType,
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.symbol, self.protocol, self.market, self.obligation_type
        )
    }
}

/// A quantified stake in a protocol market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PositionRecord")]
pub struct Position {
    pub symbol: String,
    #[serde(rename = "protocol_name")]
    pub protocol: String,
    #[serde(rename = "market_name")]
    pub market: String,
    pub amount: Decimal,
    pub obligation_type: ObligationType,
}

impl Position {
    pub fn new(
        symbol: impl Into<String>,
        protocol: impl Into<String>,
        market: impl Into<String>,
        obligation_type: ObligationType,
        amount: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            protocol: protocol.into(),
            market: market.into(),
            amount,
            obligation_type,
        }
    }

    pub fn key(&self) -> PositionKey {
        PositionKey {
            symbol: self.symbol.clone(),
            protocol: self.protocol.clone(),
            market: self.market.clone(),
            obligation_type: self.obligation_type.clone(),
        }
    }

    /// Copy of this position with a different amount
    pub fn with_amount(&self, amount: Decimal) -> Self {
        Self {
            amount,
            ..self.clone()
        }
    }
}

impl TryFrom<PositionRecord> for Position {
    type Error = Error;

    fn try_from(record: PositionRecord) -> Result<Self> {
        let symbol = required(record.symbol, "symbol")?;
        let protocol = required(record.protocol_name, "protocol_name")?;
        let market = required(record.market_name, "market_name")?;
        let obligation_type: ObligationType = required(record.obligation_type, "obligation_type")?
            .parse()?;
        let amount = parse_amount(record.amount.as_ref(), &symbol)?;

        Ok(Self {
            symbol,
            protocol,
            market,
            amount,
            obligation_type,
        })
    }
}

/// Unallocated token holding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BalanceRecord")]
pub struct Balance {
    pub symbol: String,
    pub amount: Decimal,
}

impl Balance {
    pub fn new(symbol: impl Into<String>, amount: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            amount,
        }
    }
}

impl TryFrom<BalanceRecord> for Balance {
    type Error = Error;

    fn try_from(record: BalanceRecord) -> Result<Self> {
        let symbol = required(record.symbol, "symbol")?;
        let amount = parse_amount(record.amount.as_ref(), &symbol)?;
        Ok(Self { symbol, amount })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::MalformedPosition(format!(
            "missing required field '{}'",
            field
        ))),
    }
}

fn parse_amount(field: Option<&AmountField>, symbol: &str) -> Result<Decimal> {
    let field = field.ok_or_else(|| {
        Error::MalformedPosition(format!("missing required field 'amount' for {}", symbol))
    })?;
    let amount = field.parse().ok_or_else(|| {
        Error::MalformedPosition(format!("unparsable amount {:?} for {}", field, symbol))
    })?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(Error::MalformedPosition(format!(
            "negative amount {} for {}",
            amount, symbol
        )));
    }
    Ok(amount)
}

/// Positions keyed by identity, preserving input order
#[derive(Debug, Clone, Default)]
pub struct PositionSet {
    positions: Vec<Position>,
    index: HashMap<PositionKey, usize>,
}

impl PositionSet {
    /// Build a set, rejecting duplicate keys
    pub fn new(positions: Vec<Position>) -> Result<Self> {
        let mut index = HashMap::with_capacity(positions.len());
        for (i, position) in positions.iter().enumerate() {
            if index.insert(position.key(), i).is_some() {
                return Err(Error::MalformedPosition(format!(
                    "duplicate position key {}",
                    position.key()
                )));
            }
        }
        Ok(Self { positions, index })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PositionKey) -> Option<&Position> {
        self.index.get(key).map(|&i| &self.positions[i])
    }

    pub fn contains_key(&self, key: &PositionKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Position> {
        self.positions.iter()
    }

    pub fn as_slice(&self) -> &[Position] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn total_amount(&self) -> Decimal {
        self.positions.iter().map(|p| p.amount).sum()
    }
}

impl TryFrom<Vec<Position>> for PositionSet {
    type Error = Error;

    fn try_from(positions: Vec<Position>) -> Result<Self> {
        Self::new(positions)
    }
}

impl Serialize for PositionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.positions)
    }
}

impl<'a> IntoIterator for &'a PositionSet {
    type Item = &'a Position;
    type IntoIter = std::slice::Iter<'a, Position>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions.iter()
    }
}

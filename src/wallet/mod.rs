//! Wallet state snapshots
//!
//! A snapshot is what the wallet data API reports for one wallet: unallocated
//! token balances plus lending positions. Snapshots are validated on
//! construction, so a malformed record fails the whole snapshot.

mod summary;

pub use summary::{Allocation, AllocationKind, WalletSummary};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::portfolio::{Balance, BalanceRecord, Position, PositionRecord, PositionSet};
use crate::{Error, Result};

/// Wire shape of the wallet data API response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletRecord {
    #[serde(default)]
    pub wallet_balances: Vec<BalanceRecord>,
    #[serde(default)]
    pub wallet_positions: Vec<PositionRecord>,
}

/// Validated wallet state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "WalletRecord")]
pub struct WalletSnapshot {
    wallet_balances: Vec<Balance>,
    wallet_positions: PositionSet,
}

impl WalletSnapshot {
    pub fn new(balances: Vec<Balance>, positions: Vec<Position>) -> Result<Self> {
        Ok(Self {
            wallet_balances: balances,
            wallet_positions: PositionSet::new(positions)?,
        })
    }

    /// Parse the wallet data API payload
    pub fn from_json(json: &str) -> Result<Self> {
        let record: WalletRecord = serde_json::from_str(json)?;
        Self::try_from(record)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let record: WalletRecord = serde_json::from_value(value)?;
        Self::try_from(record)
    }

    pub fn balances(&self) -> &[Balance] {
        &self.wallet_balances
    }

    pub fn positions(&self) -> &PositionSet {
        &self.wallet_positions
    }

    /// Value of positions and balances combined
    pub fn total_value(&self) -> Decimal {
        let balances: Decimal = self.wallet_balances.iter().map(|b| b.amount).sum();
        self.wallet_positions.total_amount() + balances
    }

    pub fn summary(&self) -> WalletSummary {
        WalletSummary::from_snapshot(self)
    }
}

impl TryFrom<WalletRecord> for WalletSnapshot {
    type Error = Error;

    fn try_from(record: WalletRecord) -> Result<Self> {
        let balances = record
            .wallet_balances
            .into_iter()
            .map(Balance::try_from)
            .collect::<Result<Vec<_>>>()?;
        let positions = record
            .wallet_positions
            .into_iter()
            .map(Position::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::new(balances, positions)
    }
}

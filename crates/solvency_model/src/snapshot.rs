//! Input snapshot: markets, user accounts and position books
//!
//! The serde records mirror the on-disk JSON one-to-one and carry raw
//! fixed-point integers. [`Market`] and [`AccountSnapshot`] are the typed
//! views the rest of the engine works on.

use std::collections::{BTreeMap, HashMap};

use amm_model::{Curve, MarketPosition, Scale, ScaledAmount};
use serde::{Deserialize, Serialize};

use crate::error::SummaryError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub markets: Vec<MarketRecord>,
    pub users: Vec<UserRecord>,
    pub user_positions: Vec<UserPositionsRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRecord {
    pub market_index: u64,
    pub symbol: String,
    #[serde(default = "initialized_by_default")]
    pub initialized: bool,
    pub base_asset_amount: i128,
    pub base_asset_amount_long: i128,
    pub base_asset_amount_short: i128,
    pub margin_ratio_initial: i128,
    pub amm: AmmRecord,
}

fn initialized_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmmRecord {
    pub base_asset_reserve: i128,
    pub quote_asset_reserve: i128,
    pub sqrt_k: i128,
    pub peg_multiplier: i128,
    #[serde(default)]
    pub cumulative_funding_rate: i128,
    #[serde(default)]
    pub total_fee: i128,
    #[serde(default)]
    pub total_fee_minus_distributions: i128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub authority: String,
    pub collateral: i128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPositionsRecord {
    pub user: String,
    pub positions: Vec<PositionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    pub market_index: u64,
    pub base_asset_amount: i128,
    pub quote_asset_amount: i128,
    #[serde(default)]
    pub last_cumulative_funding_rate: i128,
}

/// One perpetual market with its canonical curve
#[derive(Debug, PartialEq, Eq)]
pub struct Market {
    pub market_index: u64,
    pub symbol: String,
    pub initialized: bool,
    /// Net base exposure of all users (reserve precision)
    pub base_asset_amount: ScaledAmount,
    pub base_asset_amount_long: ScaledAmount,
    pub base_asset_amount_short: ScaledAmount,
    /// Initial margin ratio (margin precision)
    pub margin_ratio_initial: ScaledAmount,
    pub amm: Curve,
}

impl From<&MarketRecord> for Market {
    fn from(record: &MarketRecord) -> Self {
        let amm = &record.amm;
        Market {
            market_index: record.market_index,
            symbol: record.symbol.clone(),
            initialized: record.initialized,
            base_asset_amount: ScaledAmount::new(record.base_asset_amount, Scale::RESERVE),
            base_asset_amount_long: ScaledAmount::new(record.base_asset_amount_long, Scale::RESERVE),
            base_asset_amount_short: ScaledAmount::new(
                record.base_asset_amount_short,
                Scale::RESERVE,
            ),
            margin_ratio_initial: ScaledAmount::new(record.margin_ratio_initial, Scale::MARGIN),
            amm: Curve {
                base_asset_reserve: ScaledAmount::new(amm.base_asset_reserve, Scale::RESERVE),
                quote_asset_reserve: ScaledAmount::new(amm.quote_asset_reserve, Scale::RESERVE),
                sqrt_k: ScaledAmount::new(amm.sqrt_k, Scale::RESERVE),
                peg_multiplier: ScaledAmount::new(amm.peg_multiplier, Scale::PEG),
                cumulative_funding_rate: ScaledAmount::new(
                    amm.cumulative_funding_rate,
                    Scale::FUNDING_RATE,
                ),
                total_fee: ScaledAmount::new(amm.total_fee, Scale::QUOTE),
                total_fee_minus_distributions: ScaledAmount::new(
                    amm.total_fee_minus_distributions,
                    Scale::QUOTE,
                ),
            },
        }
    }
}

impl From<&PositionRecord> for MarketPosition {
    fn from(record: &PositionRecord) -> Self {
        MarketPosition::new(
            record.market_index,
            ScaledAmount::new(record.base_asset_amount, Scale::RESERVE),
            ScaledAmount::new(record.quote_asset_amount, Scale::QUOTE),
            ScaledAmount::new(record.last_cumulative_funding_rate, Scale::FUNDING_RATE),
        )
    }
}

/// A user's collateral joined with their position book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub user: String,
    /// Deposited collateral (quote precision)
    pub collateral: ScaledAmount,
    pub positions: Vec<MarketPosition>,
}

impl Snapshot {
    /// Markets keyed by index, in index order
    pub fn markets(&self) -> Result<BTreeMap<u64, Market>, SummaryError> {
        let mut markets = BTreeMap::new();
        for record in &self.markets {
            if markets
                .insert(record.market_index, Market::from(record))
                .is_some()
            {
                return Err(SummaryError::DuplicateMarket {
                    market_index: record.market_index,
                });
            }
        }
        Ok(markets)
    }

    /// Join every position book with its owning user account
    ///
    /// Users without a position book contribute nothing. A position book
    /// whose user is missing is a data-consistency error, as is a negative
    /// quote cost basis: longs and shorts both carry it as a magnitude.
    pub fn accounts(&self) -> Result<Vec<AccountSnapshot>, SummaryError> {
        let users: HashMap<&str, &UserRecord> = self
            .users
            .iter()
            .map(|user| (user.authority.as_str(), user))
            .collect();

        self.user_positions
            .iter()
            .map(|book| {
                let user = users.get(book.user.as_str()).ok_or_else(|| {
                    SummaryError::MissingAccount {
                        user: book.user.clone(),
                    }
                })?;
                if let Some(bad) = book.positions.iter().find(|p| p.quote_asset_amount < 0) {
                    return Err(SummaryError::NegativeCostBasis {
                        user: book.user.clone(),
                        market_index: bad.market_index,
                    });
                }
                Ok(AccountSnapshot {
                    user: book.user.clone(),
                    collateral: ScaledAmount::new(user.collateral, Scale::QUOTE),
                    positions: book.positions.iter().map(MarketPosition::from).collect(),
                })
            })
            .collect()
    }
}

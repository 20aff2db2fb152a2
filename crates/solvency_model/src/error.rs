//! Errors raised while building a summary

use amm_model::AmmError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SummaryError {
    /// A position book points at a user that is not in the snapshot
    #[error("position book references unknown user account {user}")]
    MissingAccount { user: String },

    /// A position points at a market index that is not in the snapshot
    #[error("position references unknown market index {market_index}")]
    UnknownMarket { market_index: u64 },

    /// Cost bases are magnitudes for either side; a negative one is corrupt data
    #[error("position of user {user} in market {market_index} has a negative quote cost basis")]
    NegativeCostBasis { user: String, market_index: u64 },

    #[error("market index {market_index} appears more than once in the snapshot")]
    DuplicateMarket { market_index: u64 },

    #[error("arithmetic fault in {context}: {source}")]
    Arithmetic {
        context: String,
        #[source]
        source: AmmError,
    },
}

impl SummaryError {
    pub fn arithmetic(context: impl Into<String>, source: AmmError) -> Self {
        SummaryError::Arithmetic {
            context: context.into(),
            source,
        }
    }
}

//! Compression savings and privacy levels
//!
//! Static guidance shown next to a PayLink: what compressed token
//! accounts save over regular ones, and what each privacy level implies
//! for payment construction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rent-exempt minimum for a regular token account
pub const REGULAR_TOKEN_RENT_LAMPORTS: u64 = 2_039_280;
/// State compression fee for a compressed token account
pub const COMPRESSED_STATE_FEE_LAMPORTS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionSavings {
    pub regular_lamports: u64,
    pub compressed_lamports: u64,
    /// Rounded to one decimal
    pub savings_percent: f64,
}

impl CompressionSavings {
    /// e.g. `99.8%`
    pub fn label(&self) -> String {
        format!("{:.1}%", self.savings_percent)
    }
}

pub fn compression_savings() -> CompressionSavings {
    let regular = REGULAR_TOKEN_RENT_LAMPORTS as f64;
    let compressed = COMPRESSED_STATE_FEE_LAMPORTS as f64;
    let percent = (regular - compressed) / regular * 100.0;

    CompressionSavings {
        regular_lamports: REGULAR_TOKEN_RENT_LAMPORTS,
        compressed_lamports: COMPRESSED_STATE_FEE_LAMPORTS,
        savings_percent: (percent * 10.0).round() / 10.0,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyLevel {
    #[default]
    Standard,
    Enhanced,
    Maximum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyRecommendation {
    pub use_compressed_tokens: bool,
    pub include_memo: bool,
    pub additional_mixing: bool,
    pub description: &'static str,
}

impl PrivacyLevel {
    pub const ALL: [PrivacyLevel; 3] = [
        PrivacyLevel::Standard,
        PrivacyLevel::Enhanced,
        PrivacyLevel::Maximum,
    ];

    pub fn recommendation(&self) -> PrivacyRecommendation {
        match self {
            PrivacyLevel::Standard => PrivacyRecommendation {
                use_compressed_tokens: true,
                include_memo: true,
                additional_mixing: false,
                description: "Compressed tokens with a memo for PayLink matching",
            },
            PrivacyLevel::Enhanced => PrivacyRecommendation {
                use_compressed_tokens: true,
                include_memo: false,
                additional_mixing: false,
                description: "Compressed tokens without a memo, matched by amount and recipient",
            },
            PrivacyLevel::Maximum => PrivacyRecommendation {
                use_compressed_tokens: true,
                include_memo: false,
                additional_mixing: true,
                description: "No identifying memo and additional mixing",
            },
        }
    }

    /// Memo flag for PayLinks created at this level
    pub fn memo_enabled(&self) -> bool {
        self.recommendation().include_memo
    }
}

impl fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrivacyLevel::Standard => "standard",
            PrivacyLevel::Enhanced => "enhanced",
            PrivacyLevel::Maximum => "maximum",
        })
    }
}

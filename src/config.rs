use serde::{Deserialize, Serialize};
use std::fs;

use crate::confirm::PollConfig;
use crate::validate::MinimumPolicy;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    #[serde(default)]
    pub rate: RateConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub ledger: LedgerEndpoints,
    #[serde(default)]
    pub funding: FundingConfig,
}

/// Price source settings. `asset_id` keys both the rate query and the
/// reference-rate field in settlement replies.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RateConfig {
    pub endpoint: String,
    pub asset_id: String,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.coingecko.com/api/v3/simple/price".to_string(),
            asset_id: "the-open-network".to_string(),
        }
    }
}

/// Read-only chain state endpoint (account sequence / last transaction).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChainConfig {
    pub wallet_info_url: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            wallet_info_url: "https://toncenter.com/api/v2/getWalletInformation".to_string(),
        }
    }
}

/// Backend ledger endpoints.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LedgerEndpoints {
    pub activation_url: String,
    pub settlement_url: String,
    pub withdraw_url: String,
    pub withdraw_status_url: String,
    pub balance_url: String,
}

impl Default for LedgerEndpoints {
    fn default() -> Self {
        Self {
            activation_url: "https://ledger.example/api/activation".to_string(),
            settlement_url: "https://ledger.example/api/fund".to_string(),
            withdraw_url: "https://ledger.example/withdraw".to_string(),
            withdraw_status_url: "https://ledger.example/check-transaction".to_string(),
            balance_url: "https://ledger.example/api/usd_balance".to_string(),
        }
    }
}

/// Orchestrator policy knobs.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FundingConfig {
    /// Custody wallet deposits are transferred to.
    pub custody_address: String,
    /// How long a built transfer request stays signable.
    pub request_ttl_secs: u64,
    #[serde(default)]
    pub minimums: MinimumPolicy,
    /// Deposit confirmation cadence (sequence watching).
    #[serde(default = "PollConfig::sequence_default")]
    pub sequence_poll: PollConfig,
    /// Withdrawal confirmation cadence (backend probe).
    #[serde(default = "PollConfig::probe_default")]
    pub probe_poll: PollConfig,
}

impl Default for FundingConfig {
    fn default() -> Self {
        Self {
            custody_address: String::new(),
            request_ttl_secs: 300,
            minimums: MinimumPolicy::default(),
            sequence_poll: PollConfig::sequence_default(),
            probe_poll: PollConfig::probe_default(),
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }
}

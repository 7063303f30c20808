// Radicle Registry
// Copyright (C) 2019 Monadic GmbH <radicle@monadic.xyz>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License version 3 as
// published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! JSON ledger scripts replayed into a fresh ledger before every command.
//!
//! ```json
//! {
//!   "accounts": [{ "id": "alice", "balance": 100, "nonce": 0 }],
//!   "transactions": [
//!     { "author": "alice", "message": { "type": "RegisterProject", "project_id": "p", "account_id": "p" } }
//!   ],
//!   "rewards": [{ "epoch": 0, "rewards": [["p", 10]] }]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error as ThisError;

use oscoin_ledger_client::{
    Account, Balance, ClientT, Committed, Error as ClientError, ProjectId, Transaction,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerScript {
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    pub rewards: Vec<EpochRewards>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpochRewards {
    pub epoch: u64,
    pub rewards: Vec<(ProjectId, Balance)>,
}

#[derive(Debug, ThisError)]
pub enum ScriptError {
    #[error("Failed to read the ledger script {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid ledger script {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to replay the ledger script")]
    Replay(#[from] ClientError),
}

/// Outcome of one scripted transaction. Rejected transactions do not stop the replay.
#[derive(Debug)]
pub struct Outcome {
    pub transaction: Transaction,
    pub result: Result<Committed, ClientError>,
}

impl LedgerScript {
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let content = std::fs::read(path).map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&content).map_err(|source| ScriptError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply accounts, then transactions in order, then rewards.
    ///
    /// Fails if an account or a reward cannot be recorded.
    pub async fn replay(&self, client: &impl ClientT) -> Result<Vec<Outcome>, ScriptError> {
        for account in &self.accounts {
            client.set_account(account.clone()).await?;
        }

        let mut outcomes = Vec::with_capacity(self.transactions.len());
        for transaction in &self.transactions {
            let result = client.submit_transaction(transaction.clone()).await;
            if let Err(error) = &result {
                log::info!("scripted transaction by {} rejected: {}", transaction.author, error);
            }
            outcomes.push(Outcome {
                transaction: transaction.clone(),
                result,
            });
        }

        for epoch in &self.rewards {
            client
                .record_rewards(epoch.epoch, epoch.rewards.clone())
                .await?;
        }
        log::debug!(
            "replayed {} accounts, {} transactions and {} reward epochs",
            self.accounts.len(),
            outcomes.len(),
            self.rewards.len()
        );
        Ok(outcomes)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use oscoin_ledger_client::{Client, Query, QueryResult};

    const SCRIPT: &str = r#"{
        "accounts": [{ "id": "alice", "balance": 100, "nonce": 0 }],
        "transactions": [
            { "author": "alice", "message": { "type": "RegisterProject", "project_id": "p", "account_id": "p" } },
            { "author": "alice", "message": { "type": "RegisterProject", "project_id": "p", "account_id": "p" } }
        ],
        "rewards": [{ "epoch": 0, "rewards": [["p", 10]] }]
    }"#;

    #[async_std::test]
    async fn replay_applies_everything_in_order() {
        let script: LedgerScript = serde_json::from_str(SCRIPT).unwrap();
        let client = Client::new_emulator();
        let outcomes = script.replay(&client).await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());

        let reward = client
            .query(&"projects/p/rewards/0".parse::<Query>().unwrap())
            .await
            .unwrap();
        assert_eq!(reward, QueryResult::Reward(Some(10)));
    }

    #[test]
    fn sections_are_optional() {
        let script: LedgerScript = serde_json::from_str("{}").unwrap();
        assert_eq!(script, LedgerScript::default());
    }
}

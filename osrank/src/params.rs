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

//! Hyper parameters of the osrank computation.

use serde::{Deserialize, Serialize};

use oscoin_ledger_core::{hash_of, H256};

/// Relative weights of the edges a random walk can follow.
///
/// Weights of the edges leaving a node are normalized, so only the ratios between the
/// weights that apply to the same kind of node matter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeWeights {
    /// From a project to a project it depends on.
    pub dependency: f64,
    /// From a project to one of its maintainers.
    pub maintainer: f64,
    /// From a project to one of its contributors, shared by contribution count.
    pub contributor: f64,
    /// From a maintainer to the project.
    pub maintained_project: f64,
    /// From a contributor to the project, shared by contribution count.
    pub contributed_project: f64,
}

impl Default for EdgeWeights {
    fn default() -> Self {
        EdgeWeights {
            dependency: 4.0 / 7.0,
            maintainer: 2.0 / 7.0,
            contributor: 1.0 / 7.0,
            maintained_project: 3.0 / 5.0,
            contributed_project: 2.0 / 5.0,
        }
    }
}

/// Global parameters of the algorithm.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperParameters {
    /// Also `tau`. Nodes whose first phase rank is below the threshold are pruned before the
    /// second phase.
    pub pruning_threshold: f64,
    /// Probability that a random walk on a project node continues.
    pub project_damping_factor: f64,
    /// Probability that a random walk on a contributor node continues.
    pub contributor_damping_factor: f64,
    /// Also `R`. Number of random walks started from every node.
    pub walks_per_node: u32,
    pub edge_weights: EdgeWeights,
}

impl Default for HyperParameters {
    fn default() -> Self {
        HyperParameters {
            pruning_threshold: 0.0,
            project_damping_factor: 0.85,
            contributor_damping_factor: 0.85,
            walks_per_node: 10,
            edge_weights: EdgeWeights::default(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("invalid hyper parameter {name}: {reason}")]
pub struct InvalidParameter {
    pub name: &'static str,
    pub reason: &'static str,
}

fn check(name: &'static str, valid: bool, reason: &'static str) -> Result<(), InvalidParameter> {
    if valid {
        Ok(())
    } else {
        Err(InvalidParameter { name, reason })
    }
}

impl HyperParameters {
    pub fn validate(&self) -> Result<(), InvalidParameter> {
        let damping = |value: f64| (0.0..1.0).contains(&value);
        check(
            "project_damping_factor",
            damping(self.project_damping_factor),
            "must be in [0, 1)",
        )?;
        check(
            "contributor_damping_factor",
            damping(self.contributor_damping_factor),
            "must be in [0, 1)",
        )?;
        check(
            "pruning_threshold",
            (0.0..=1.0).contains(&self.pruning_threshold),
            "must be in [0, 1]",
        )?;
        check("walks_per_node", self.walks_per_node > 0, "must be positive")?;
        let weights = &self.edge_weights;
        check(
            "edge_weights",
            [
                weights.dependency,
                weights.maintainer,
                weights.contributor,
                weights.maintained_project,
                weights.contributed_project,
            ]
            .iter()
            .all(|weight| weight.is_finite() && *weight >= 0.0),
            "must be finite and not negative",
        )
    }

    /// Hash identifying the parameters. Cached ranks are only reused for equal hashes.
    pub fn hash(&self) -> H256 {
        let weights = &self.edge_weights;
        hash_of(&(
            self.pruning_threshold.to_bits(),
            self.project_damping_factor.to_bits(),
            self.contributor_damping_factor.to_bits(),
            self.walks_per_node,
            [
                weights.dependency.to_bits(),
                weights.maintainer.to_bits(),
                weights.contributor.to_bits(),
                weights.maintained_project.to_bits(),
                weights.contributed_project.to_bits(),
            ],
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partial_json() {
        let params: HyperParameters =
            serde_json::from_str(r#"{"walks_per_node": 3, "edge_weights": {"dependency": 1.0}}"#)
                .unwrap();
        assert_eq!(params.walks_per_node, 3);
        assert_eq!(params.edge_weights.dependency, 1.0);
        assert_eq!(params.edge_weights.maintainer, 2.0 / 7.0);
        assert_eq!(params.project_damping_factor, 0.85);
        params.validate().unwrap();
    }

    #[test]
    fn invalid_damping() {
        let params = HyperParameters {
            project_damping_factor: 1.0,
            ..HyperParameters::default()
        };
        assert_eq!(params.validate().unwrap_err().name, "project_damping_factor");
    }

    #[test]
    fn hash_depends_on_every_parameter() {
        let params = HyperParameters::default();
        let mut other = params.clone();
        other.edge_weights.contributed_project = 0.5;
        assert_ne!(params.hash(), other.hash());
        assert_eq!(params.hash(), HyperParameters::default().hash());
    }
}

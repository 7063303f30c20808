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

//! Define the commands that manage node-local algorithm contexts.

use super::*;

/// Context related commands
#[derive(StructOpt, Debug, Clone)]
pub enum Command {
    Reset(Reset),
}

#[async_trait::async_trait]
impl CommandT for Command {
    async fn run(&self, command_context: &CommandContext) -> Result<(), CommandError> {
        match self {
            Command::Reset(cmd) => cmd.run(command_context).await,
        }
    }
}

#[derive(StructOpt, Debug, Clone)]
/// Delete the stored context of an algorithm. The next run starts from scratch.
pub struct Reset {
    /// Id of the algorithm, for example `osrank`.
    algorithm: AlgorithmId,
}

#[async_trait::async_trait]
impl CommandT for Reset {
    async fn run(&self, command_context: &CommandContext) -> Result<(), CommandError> {
        let mut contexts = command_context.context_storage()?;
        let removed = contexts
            .reset(&self.algorithm)
            .map_err(RunError::Context)
            .map_err(Error::from)?;
        if removed {
            println!("context of {} removed", self.algorithm);
        } else {
            println!("no context stored for {}", self.algorithm);
        }
        Ok(())
    }
}

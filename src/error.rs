// Copyright 2025 ZETA RETICULA INC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PetriNetError {
    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Place already exists: {0}")]
    RepeatedPlace(String),

    #[error("Transition already exists: {0}")]
    RepeatedTransition(String),

    #[error("Place {0} appears more than once in the same arc list")]
    RepeatedPlaceInArcList(String),

    #[error("Function already registered: {0}")]
    RepeatedFunction(String),

    #[error("{0} is not an input place")]
    NotInputPlace(String),

    #[error("Number of tokens must be greater than 0")]
    NullTokens,

    #[error("Not enough tokens in place {0}")]
    NotEnoughTokens(String),

    #[error("Adding tokens to place {0} would overflow the token counter")]
    Overflow(String),

    #[error("Arc weight must be greater than 0 (place {0})")]
    ZeroWeight(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot {0} while the event loop is running")]
    AlreadyRunning(String),

    #[error("Invalid arc operation: {0}")]
    InvalidArcOp(String),

    #[error("Expired place reference held by transition {0}")]
    ExpiredReference(String),

    #[error("Timed out waiting to start the on-enter action of place {0}")]
    OnEnterBlockTimeout(String),
}

pub type Result<T> = std::result::Result<T, PetriNetError>;

impl PetriNetError {
    pub fn invalid_name<S: Into<String>>(name: S) -> Self {
        Self::InvalidName(name.into())
    }

    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn already_running<S: Into<String>>(operation: S) -> Self {
        Self::AlreadyRunning(operation.into())
    }

    pub fn invalid_arc_op<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArcOp(msg.into())
    }
}

//! Declared-order interaction orderer

use crate::code::{Check, CheckMember};
use crate::extraction::InteractionOrderer;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Interacts with data qubits in the order the check declares them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrivialOrderer {}

impl InteractionOrderer for TrivialOrderer {
    fn order<'a>(&self, check: &'a Check) -> Result<Vec<Option<&'a CheckMember>>> {
        Ok(check.members().iter().map(Some).collect())
    }
}

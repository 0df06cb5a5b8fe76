// 6.0: close-price oracles. a derivative is constructed with exactly one of
// these and it decides how positions get closed. AdministratorPush is the
// managed flavor: the administrator supplies the reference price through
// valuation calls and closes are allowed only once the valuation clock reaches
// expiry. SignedAttestation closes against a price attested by a designated
// signer, at any time.
//
// attestation checking here is an identity check against the configured
// signer. real signature verification lives outside the engine, like the
// settlement rails and custody integrations do.

use crate::types::{Price, TraderId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceOracle {
    AdministratorPush { authorized: TraderId },
    SignedAttestation { signer: TraderId },
}

/// A close price vouched for by an external signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAttestation {
    pub price: Price,
    pub signer: TraderId,
}

impl PriceOracle {
    pub fn is_managed(&self) -> bool {
        matches!(self, PriceOracle::AdministratorPush { .. })
    }

    /// Whether `caller` may push valuation prices.
    pub fn allows_push(&self, caller: TraderId) -> bool {
        match self {
            PriceOracle::AdministratorPush { authorized } => *authorized == caller,
            PriceOracle::SignedAttestation { .. } => false,
        }
    }

    /// Whether the attestation carries the signer this oracle trusts.
    pub fn accepts(&self, attestation: &PriceAttestation) -> bool {
        match self {
            PriceOracle::AdministratorPush { .. } => false,
            PriceOracle::SignedAttestation { signer } => *signer == attestation.signer,
        }
    }
}

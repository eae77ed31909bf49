//! Deployment numbers of the accounts of a conflation.
//!
//! A `(address, deployment_number)` pair identifies the bytecode that ran at
//! an address at some point of the conflation.

use std::collections::HashMap;

use ethereum_types::Address;

use crate::trace::TraceResult;
use crate::witness::errors::ProtocolViolation;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeploymentStatus {
    pub deployment_number: u64,
    pub under_deployment: bool,
    pub init_code: Vec<u8>,
}

#[derive(Clone, Debug, Default)]
pub struct DeploymentInfo {
    statuses: HashMap<Address, DeploymentStatus>,
}

impl DeploymentInfo {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self, address: Address) -> &mut DeploymentStatus {
        let status = self.statuses.entry(address).or_default();
        status.deployment_number += 1;
        status
    }

    /// Starts deploying `init_code` at `address`, and returns the new
    /// deployment number.
    pub fn new_deployment(&mut self, address: Address, init_code: Vec<u8>) -> u64 {
        let status = self.bump(address);
        status.under_deployment = true;
        status.init_code = init_code;
        status.deployment_number
    }

    /// Records a deployment attempt that failed before its init code ran. The
    /// deployment number still increases.
    pub fn failed_deployment(&mut self, address: Address) -> u64 {
        let status = self.bump(address);
        status.under_deployment = false;
        status.deployment_number
    }

    /// Ends the deployment in progress at `address`.
    pub fn finish_deployment(&mut self, address: Address) -> TraceResult<()> {
        match self.statuses.get_mut(&address) {
            Some(status) if status.under_deployment => {
                status.under_deployment = false;
                Ok(())
            }
            _ => Err(ProtocolViolation::NotUnderDeployment(address)),
        }
    }

    pub fn deployment_number(&self, address: &Address) -> u64 {
        self.statuses
            .get(address)
            .map_or(0, |status| status.deployment_number)
    }

    pub fn is_under_deployment(&self, address: &Address) -> bool {
        self.statuses
            .get(address)
            .is_some_and(|status| status.under_deployment)
    }

    pub fn init_code(&self, address: &Address) -> Option<&[u8]> {
        self.statuses
            .get(address)
            .filter(|status| status.under_deployment)
            .map(|status| status.init_code.as_slice())
    }

    pub fn status(&self, address: &Address) -> Option<&DeploymentStatus> {
        self.statuses.get(address)
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    const ADDRESS: Address = ethereum_types::H160(hex!("00000000000000000000000000000000000000aa"));

    #[test]
    fn numbers_increase_on_every_attempt() {
        let mut info = DeploymentInfo::new();
        assert_eq!(info.deployment_number(&ADDRESS), 0);

        assert_eq!(info.new_deployment(ADDRESS, vec![0x60, 0x00]), 1);
        assert!(info.is_under_deployment(&ADDRESS));
        assert_eq!(info.init_code(&ADDRESS), Some(&[0x60, 0x00][..]));
        info.finish_deployment(ADDRESS).unwrap();
        assert!(!info.is_under_deployment(&ADDRESS));
        assert_eq!(info.init_code(&ADDRESS), None);

        assert_eq!(info.failed_deployment(ADDRESS), 2);
        assert!(!info.is_under_deployment(&ADDRESS));
        assert_eq!(info.deployment_number(&ADDRESS), 2);
    }

    #[test]
    fn finishing_requires_a_deployment() {
        let mut info = DeploymentInfo::new();
        assert_eq!(
            info.finish_deployment(ADDRESS),
            Err(ProtocolViolation::NotUnderDeployment(ADDRESS))
        );
        info.failed_deployment(ADDRESS);
        assert!(info.finish_deployment(ADDRESS).is_err());
    }
}

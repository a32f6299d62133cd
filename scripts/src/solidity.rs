//! Definitions of Solidity functions called during post-deploy configuration

use alloy_primitives::Address as AlloyAddress;
use alloy_sol_types::sol;
use ethers::types::Address;

sol! {
    function setGovernanceParameter(bytes32 key, int256 value) external;
    function addMinter(address account) external;
    function renounceMinter() external;
}

/// Convert an ethers address into its alloy counterpart for calldata
/// construction
pub fn to_alloy_address(address: Address) -> AlloyAddress {
    AlloyAddress::from_slice(address.as_bytes())
}

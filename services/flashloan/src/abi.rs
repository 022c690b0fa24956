//! Minimal ABI bindings for the lending protocols this adapter supports,
//! pared to the methods actually invoked (the same minimal-ABI convention
//! this stack's Aave protocol binding uses).

use ethers::contract::abigen;

abigen!(
    IAavePool,
    r#"[
        function flashLoan(address receiverAddress, address[] calldata assets, uint256[] calldata amounts, uint256[] calldata modes, address onBehalfOf, bytes calldata params, uint16 referralCode) external
        function getReserveData(address asset) external view returns (tuple(uint256,uint256,uint256,uint256,uint256,uint256,uint40,uint16,address,address,address,address,uint128,uint128,uint128,uint128,uint8,uint8))
    ]"#
);

abigen!(
    IAavePoolDataProvider,
    r#"[
        function getReserveData(address asset) external view returns (uint256, uint256, uint256, uint256, uint256, uint256, uint256, uint256, uint256, uint256)
    ]"#
);

abigen!(
    IERC20,
    r#"[
        function balanceOf(address account) external view returns (uint256)
    ]"#
);

abigen!(
    IBalancerVault,
    r#"[
        function flashLoan(address recipient, address[] calldata tokens, uint256[] calldata amounts, bytes calldata userData) external
    ]"#
);

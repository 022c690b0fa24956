//! ABI bindings for the router/quoter contracts the supported venue kinds
//! call into. Interfaces are pared to the methods this engine actually
//! invokes, the same minimal-ABI convention the Aave binding in this
//! stack's reference material uses.

use ethers::contract::abigen;

abigen!(
    IUniswapV2Router,
    r#"[
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts)
        function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external returns (uint256[] memory amounts)
    ]"#
);

abigen!(
    IUniswapV3Quoter,
    r#"[
        function quoteExactInputSingle(address tokenIn, address tokenOut, uint24 fee, uint256 amountIn, uint160 sqrtPriceLimitX96) external returns (uint256 amountOut)
    ]"#
);

abigen!(
    IUniswapV3Router,
    r#"[
        function exactInputSingle((address tokenIn, address tokenOut, uint24 fee, address recipient, uint256 deadline, uint256 amountIn, uint256 amountOutMinimum, uint160 sqrtPriceLimitX96) params) external payable returns (uint256 amountOut)
    ]"#
);

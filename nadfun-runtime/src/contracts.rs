//! Solidity bindings for the platform's curve core, launched tokens and the
//! Uniswap-V2-compatible router used after listing.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface ICore {
        function buy(uint256 amountIn, uint256 fee, address tokenAddress, address to, uint256 deadline) external payable;
        function exactOutBuy(uint256 tokensOut, uint256 maxNativeIn, uint256 fee, address tokenAddress, address to, uint256 deadline) external payable;
    }

    #[sol(rpc)]
    interface IToken {
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
    }

    #[sol(rpc)]
    interface IUniswapV2Router {
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
        function swapExactNativeForTokens(uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external payable returns (uint256[] memory amounts);
        function swapExactTokensForNative(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external returns (uint256[] memory amounts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};
    use alloy::sol_types::SolCall;

    #[test]
    fn test_buy_calldata_layout() {
        let call = ICore::buyCall {
            amountIn: U256::from(1_000u64),
            fee: U256::from(10u64),
            tokenAddress: Address::repeat_byte(0xbb),
            to: Address::repeat_byte(0xaa),
            deadline: U256::from(1_700_001_200u64),
        };
        let data = call.abi_encode();
        // selector + five static words
        assert_eq!(data.len(), 4 + 5 * 32);
        assert_eq!(&data[..4], &ICore::buyCall::SELECTOR);
    }

    #[test]
    fn test_swap_calldata_encodes_path() {
        let call = IUniswapV2Router::swapExactTokensForNativeCall {
            amountIn: U256::from(5u64),
            amountOutMin: U256::from(4u64),
            path: vec![Address::repeat_byte(0xbb), Address::repeat_byte(0xcc)],
            to: Address::repeat_byte(0xaa),
            deadline: U256::from(1u64),
        };
        let decoded =
            IUniswapV2Router::swapExactTokensForNativeCall::abi_decode(&call.abi_encode()).unwrap();
        assert_eq!(decoded.path.len(), 2);
        assert_eq!(decoded.amountOutMin, U256::from(4u64));
    }
}

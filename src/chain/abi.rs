//! Contract bindings for the cast market ledger.
//!
//! Ledger structs are decoded by name through these bindings. A contract
//! whose return shape differs from `MarketView`/`UserBetView` fails ABI
//! decoding instead of being read positionally.

use alloy::sol;

/// Bumped whenever the bindings below change shape.
pub const MARKET_SCHEMA_VERSION: u32 = 1;

sol! {
    #[sol(rpc)]
    interface ICastMarket {
        struct MarketView {
            uint256 id;
            string castHash;
            address creator;
            uint256 threshold;
            uint256 deadline;
            uint256 moonPool;
            uint256 doomPool;
            bool resolved;
            uint8 outcome;
        }

        struct UserBetView {
            uint256 moonStake;
            uint256 doomStake;
            bool claimed;
        }

        event MarketCreated(
            uint256 indexed marketId,
            string castHash,
            address indexed creator,
            uint256 threshold,
            uint256 deadline
        );

        event MarketResolved(uint256 indexed marketId, uint8 outcome);

        function nextMarketId() external view returns (uint256);
        function getMarket(uint256 marketId) external view returns (MarketView memory);
        function getUserBet(uint256 marketId, address user) external view returns (UserBetView memory);

        function createMarket(string calldata castHash, uint256 threshold, uint256 duration) external returns (uint256);
        function placeBet(uint256 marketId, bool moon) external payable;
        function resolveMarket(uint256 marketId, uint8 outcome) external;
        function claim(uint256 marketId) external;
    }
}

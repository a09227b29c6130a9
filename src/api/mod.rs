pub mod coingecko;
pub mod moralis;
pub mod pumpfun;

pub use coingecko::CoinGeckoClient;
pub use moralis::{MoralisBondingStatus, MoralisClient, MoralisTokenPrice};
pub use pumpfun::{PumpFunClient, PumpFunCoin};

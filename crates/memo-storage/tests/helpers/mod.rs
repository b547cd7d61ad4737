#![allow(dead_code, deprecated)]

pub mod mock_chain;
pub mod mock_wallet;

pub use mock_chain::*;
pub use mock_wallet::*;

pub mod candle;
pub mod filter;
pub mod market;
pub mod screen_result;

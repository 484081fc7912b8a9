pub mod market_data_client;

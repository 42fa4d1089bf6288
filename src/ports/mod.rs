pub mod config_port;
pub mod gateway_port;
pub mod market_data_port;

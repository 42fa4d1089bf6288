pub mod binance_adapter;
pub mod csv_candle_adapter;
pub mod file_config_adapter;
pub mod paper_gateway;

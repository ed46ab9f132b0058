pub mod defaults;
pub mod pcal_config;

pub use pcal_config::PcalConfig;

use super::*;

pub mod transport_mock;

mod anomaly_test;
mod codec_test;
mod config_test;
mod datom_test;
mod endpoint_test;
mod request_test;

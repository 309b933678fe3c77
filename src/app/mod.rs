pub mod ports;
pub mod publish_use_case;
pub mod run_use_case;

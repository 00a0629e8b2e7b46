//! Collaborator traits (ports) the engine depends on.

pub mod broker_port;
pub mod config_port;
pub mod data_port;
pub mod indicator_port;
pub mod predictor_port;

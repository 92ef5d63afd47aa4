//! MQTT transport implementation built on rumqttc

mod client;
mod connection;

pub use client::MqttClient;
pub use connection::{configure_mqtt_options, ConnectionState, MqttError};

//! # MQTT Transport Module
//!
//! Owns everything that touches the broker: which topic belongs to which
//! channel, the connection lifecycle, and publishing commands.
//!
//! ## Module Architecture
//!
//! ```text
//! mqtt/
//! ├── config.rs        - Broker address, keep-alive, backoff, client id
//! ├── topics.rs        - Channel enum and the channel <-> topic registry
//! ├── mqtt_handler.rs  - Session driver: connect, subscribe, route inbound
//! └── publisher.rs     - Outbound command publishing
//! ```
//!
//! ## Design Philosophy
//!
//! - **One client, two halves**: rumqttc hands out an `AsyncClient` and an
//!   `EventLoop`. The event loop lives inside the session driver task; clones
//!   of the client are used for subscribing and publishing.
//! - **Channels, not strings**: outside of `topics.rs` nothing derives a
//!   channel from a topic string.
//! - **Best effort**: QoS 0 both ways. A lost command is not retried; the
//!   rover's own state comes back on the status topics.

pub mod config;
pub mod mqtt_handler;
pub mod publisher;
pub mod topics;

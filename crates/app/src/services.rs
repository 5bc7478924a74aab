//! Application services: use-case implementations.
//!
//! Each service accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod connection_manager;
pub mod device_reader;
pub mod lights_controller;
pub mod notification_handler;
pub mod thunderboard_service;

pub use connection_manager::{ConnectionManager, Session};
pub use device_reader::read_device;
pub use lights_controller::LightsController;
pub use notification_handler::{NotificationHandler, on_notify};
pub use thunderboard_service::{ThunderboardService, UpdateOptions};

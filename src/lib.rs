pub mod actuator_mapper;
pub mod command_decoder;
pub mod config;
pub mod controller;
pub mod finger;
pub mod hand_hal;
pub mod hand_hal_factory;
pub mod hand_hal_mock;
pub mod motion_sequencer;
pub mod pose_debouncer;
pub mod sensor_gate;
pub mod serial_link;
pub mod sysfs;

// Application layer - Use cases and the trip pipeline
pub mod fleet_backend;
pub mod fleet_service;
pub mod gps_accumulator;
pub mod poller;
pub mod trip_buffer;
pub mod trip_controller;
pub mod trip_detector;

pub mod catalog;
pub mod dictionary;
pub mod generator;
#[cfg(not(target_arch = "wasm32"))]
pub mod menu;
pub mod store;

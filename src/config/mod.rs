//! Configuration management for Gjort.

mod settings;

pub use settings::{ChatSettings, GeneralSettings, ModelSettings, Settings, StoreSettings};

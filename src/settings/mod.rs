mod manager;
mod proxy;

pub use manager::SettingsManager;
pub use proxy::{EffectiveProxy, NewProxy};

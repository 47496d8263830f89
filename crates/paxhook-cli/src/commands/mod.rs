pub mod models;
pub mod providers;
pub mod settings;

pub use models::ModelsCommand;
pub use providers::ProvidersCommand;
pub use settings::SettingsCommand;

pub mod registration_watcher;

pub use registration_watcher::RegistrationWatcher;

use std::sync::OnceLock;

/// Application user interface config.
#[derive(Debug)]
pub struct UIConfig {
    /// Save command history in a regular file.
    pub save_history: bool,
}

/// Read-only ui configuration (set only once, at application start).
static CONFIG: OnceLock<UIConfig> = OnceLock::new();

/// Set initial configuration.
pub fn set(config: UIConfig) {
    CONFIG.set(config).expect("should called once");
}

/// Return application ui config.
pub fn current() -> &'static UIConfig {
    CONFIG.get_or_init(|| UIConfig { save_history: true })
}

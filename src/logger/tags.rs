/// Log tags identify the subsystem a message comes from
///
/// Each tag maps to a `--debug-<key>` flag that enables its debug output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Sampler,
    Hub,
    Webserver,
    Supervisor,
    Test,
    Other(String),
}

impl LogTag {
    /// Key used in `--debug-<key>` / `--verbose-<key>` flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::Sampler => "sampler".to_string(),
            LogTag::Hub => "hub".to_string(),
            LogTag::Webserver => "webserver".to_string(),
            LogTag::Supervisor => "supervisor".to_string(),
            LogTag::Test => "test".to_string(),
            LogTag::Other(name) => name.to_lowercase(),
        }
    }

    /// Uncolored label used in the log file
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::System => "SYSTEM".to_string(),
            LogTag::Config => "CONFIG".to_string(),
            LogTag::Sampler => "SAMPLER".to_string(),
            LogTag::Hub => "HUB".to_string(),
            LogTag::Webserver => "WEBSERVER".to_string(),
            LogTag::Supervisor => "SUPERVISOR".to_string(),
            LogTag::Test => "TEST".to_string(),
            LogTag::Other(name) => name.to_uppercase(),
        }
    }
}

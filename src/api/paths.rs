//! All Paths are recorded here for use throughout this codebase
pub mod base {
    pub const ROOT: &str = "/";
    pub const HEALTH: &str = "/health";
    pub const ABOUT: &str = "/about";
}

pub mod sync {
    pub const STATUS: &str = "/status";
    pub const SCHEDULE: &str = "/schedule";
    pub const RECONCILE: &str = "/reconcile";
}

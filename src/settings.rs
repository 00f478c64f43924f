//! aclsync application settings
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::membership::ClusterMember;
use crate::ports::PortSettings;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name the reconciliation job is registered under
pub const JOB_NAME: &str = "Update_SG";

pub const STANDARD_PRIMARY_PORT: u16 = 7103;
pub const DEFAULT_PRIMARY_PORT: &str = "7103";
pub const STANDARD_PORT_HTTP: u16 = 8420;
pub const DEFAULT_PORT_HTTP: &str = "8420";

pub const STANDARD_BASE_INTERVAL_SECS: u64 = 120;
pub const DEFAULT_BASE_INTERVAL_SECS: &str = "120";
pub const STANDARD_JITTER_SECS: u64 = 120;
pub const DEFAULT_JITTER_SECS: &str = "120";

/// Which ACL backend the daemon talks to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    File,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::File => write!(f, "file"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "file" => Ok(BackendKind::File),
            _ => Err(format!("Invalid acl backend: {}", s)),
        }
    }
}

/// How this node decides whether it is a seed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoleMode {
    Seed,
    Peer,
    /// First member of the local rack is the seed
    Auto,
}

impl std::fmt::Display for RoleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleMode::Seed => write!(f, "seed"),
            RoleMode::Peer => write!(f, "peer"),
            RoleMode::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for RoleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "seed" => Ok(RoleMode::Seed),
            "peer" => Ok(RoleMode::Peer),
            "auto" => Ok(RoleMode::Auto),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    // Application / cluster name used to scope membership queries
    pub app_name: String,

    // Port every member must be able to reach
    pub primary_port: u16,

    // Extra ports kept open alongside the primary one
    pub additional_ports: BTreeSet<u16>,

    // Identity of this node
    pub local_address: String,
    pub instance_id: String,
    pub hostname: String,
    pub rack: Option<String>,

    // Seed / peer selection
    pub role: RoleMode,

    // Membership: static roster, or a registry to query
    pub members: Vec<ClusterMember>,
    pub membership_url: Option<Url>,

    // ACL backend
    pub acl_backend: BackendKind,
    pub acl_file: PathBuf,

    // Seed cadence
    pub base_interval_secs: u64,
    pub jitter_secs: u64,
    pub rng_seed: Option<u64>,

    // Admin API
    pub listen_address: String,
    pub listen_port: u16,
    pub disable_api: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            primary_port: STANDARD_PRIMARY_PORT,
            additional_ports: BTreeSet::new(),
            local_address: "127.0.0.1".to_string(),
            instance_id: "local".to_string(),
            hostname: "localhost".to_string(),
            rack: None,
            role: RoleMode::Peer,
            members: Vec::new(),
            membership_url: None,
            acl_backend: BackendKind::Memory,
            acl_file: PathBuf::from("acls.json"),
            base_interval_secs: STANDARD_BASE_INTERVAL_SECS,
            jitter_secs: STANDARD_JITTER_SECS,
            rng_seed: None,
            listen_address: "0.0.0.0".to_string(),
            listen_port: STANDARD_PORT_HTTP,
            disable_api: false,
        }
    }
}

impl Settings {
    pub fn base_interval(&self) -> Duration {
        Duration::from_secs(self.base_interval_secs)
    }

    pub fn jitter_range(&self) -> Duration {
        Duration::from_secs(self.jitter_secs)
    }

    /// This node as a roster entry, used by rack-based seed classification
    pub fn local_member(&self) -> ClusterMember {
        ClusterMember {
            host_address: self.local_address.clone(),
            instance_id: Some(self.instance_id.clone()),
            hostname: Some(self.hostname.clone()),
            rack: self.rack.clone(),
        }
    }
}

impl PortSettings for Settings {
    fn primary_port(&self) -> u16 {
        self.primary_port
    }

    fn additional_ports(&self) -> BTreeSet<u16> {
        self.additional_ports.clone()
    }
}

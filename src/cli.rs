//! CLI for this application
//!
use std::collections::BTreeSet;
use std::path::PathBuf;

use reqwest::Url;

use crate::config_error;
use crate::error::Result;
use crate::membership::ClusterMember;
use crate::settings;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Debug, clap::Parser)]
#[command(name = "aclsync", version, about)]
pub struct Cli {
    // Cluster / application name used to scope membership queries
    #[clap(
        long,
        default_value = settings::APP_NAME,
        env("ACLSYNC_APP_NAME"),
        help = "Application (cluster) name whose members are allowed in"
    )]
    pub app_name: String,

    // Primary port
    #[clap(
        long,
        default_value = settings::DEFAULT_PRIMARY_PORT,
        env("ACLSYNC_PRIMARY_PORT"),
        help = "Port that must always be open between members"
    )]
    pub primary_port: u16,

    // Additional ports
    #[clap(
        long,
        env("ACLSYNC_ADDITIONAL_PORTS"),
        value_delimiter = ',',
        help = "Extra ports to keep open (e.g., 7104,7105)"
    )]
    pub additional_ports: Vec<u16>,

    // This node's routable address
    #[clap(
        long,
        default_value = "127.0.0.1",
        env("ACLSYNC_LOCAL_ADDRESS"),
        help = "Routable address of this node"
    )]
    pub local_address: String,

    #[clap(
        long,
        default_value = "local",
        env("ACLSYNC_INSTANCE_ID"),
        help = "Instance identifier of this node"
    )]
    pub instance_id: String,

    #[clap(
        long,
        default_value = "localhost",
        env("ACLSYNC_HOSTNAME"),
        help = "Hostname of this node"
    )]
    pub hostname: String,

    #[clap(
        long,
        env("ACLSYNC_RACK"),
        help = "Failure domain (rack / availability zone) of this node"
    )]
    pub rack: Option<String>,

    // Seed or peer
    #[clap(
        long,
        default_value = "peer",
        env("ACLSYNC_ROLE"),
        help = "role: 'seed', 'peer', or 'auto' (first member of each rack is a seed)"
    )]
    pub role: settings::RoleMode,

    // Static roster
    #[clap(
        long,
        env("ACLSYNC_MEMBERS"),
        value_delimiter = ',',
        help = "Static cluster roster as host[@rack] (e.g., 10.0.0.1@us-east-1a,10.0.0.2@us-east-1b)"
    )]
    pub members: Vec<ClusterMember>,

    // Membership registry
    #[clap(
        long,
        env("ACLSYNC_MEMBERSHIP_URL"),
        help = "Base URL of a membership registry. Takes precedence over --members."
    )]
    pub membership_url: Option<Url>,

    #[clap(
        long,
        default_value = "memory",
        env("ACLSYNC_ACL_BACKEND"),
        help = "acl-backend: 'memory' or 'file'"
    )]
    pub acl_backend: settings::BackendKind,

    #[clap(
        long,
        default_value = "acls.json",
        env("ACLSYNC_ACL_FILE"),
        help = "Path of the JSON file used by the 'file' backend"
    )]
    pub acl_file: PathBuf,

    #[clap(
        long,
        default_value = settings::DEFAULT_BASE_INTERVAL_SECS,
        env("ACLSYNC_BASE_INTERVAL_SECONDS"),
        help = "Seed nodes: base seconds between passes"
    )]
    pub base_interval_secs: u64,

    #[clap(
        long,
        default_value = settings::DEFAULT_JITTER_SECS,
        env("ACLSYNC_JITTER_SECONDS"),
        help = "Seed nodes: upper bound (exclusive) of random seconds added to each interval"
    )]
    pub jitter_secs: u64,

    #[clap(
        long,
        env("ACLSYNC_RNG_SEED"),
        help = "Seed for the jitter generator (reproducible schedules)"
    )]
    pub rng_seed: Option<u64>,

    // Server listen address
    #[clap(
        long,
        default_value = "0.0.0.0",
        env("ACLSYNC_LISTEN_ADDRESS"),
        help = "IP Address to listen on"
    )]
    pub listen_address: String,

    // HTTP API listen port
    #[clap(
        long,
        default_value = settings::DEFAULT_PORT_HTTP,
        env("ACLSYNC_HTTP_LISTEN_PORT"),
        help = "Port to bind the admin HTTP API to"
    )]
    pub listen_port: u16,

    #[clap(
        long,
        env("ACLSYNC_DISABLE_API"),
        help = "Do not start the admin HTTP API"
    )]
    pub disable_api: bool,

    #[clap(long, env("ACLSYNC_JSON_LOGS"), help = "Emit logs as JSON")]
    pub json_logs: bool,
}

impl Cli {
    pub fn into_settings(self) -> Result<settings::Settings> {
        if self.primary_port == 0 {
            return Err(config_error!("primary port must be non-zero"));
        }
        if self.additional_ports.contains(&0) {
            return Err(config_error!("additional ports must be non-zero"));
        }
        if self.local_address.trim().is_empty() {
            return Err(config_error!("local address must not be empty"));
        }
        if self.membership_url.is_none() && self.members.is_empty() {
            return Err(config_error!(
                "either --members or --membership-url is required"
            ));
        }

        Ok(settings::Settings {
            app_name: self.app_name,
            primary_port: self.primary_port,
            additional_ports: self.additional_ports.into_iter().collect::<BTreeSet<u16>>(),
            local_address: self.local_address,
            instance_id: self.instance_id,
            hostname: self.hostname,
            rack: self.rack,
            role: self.role,
            members: self.members,
            membership_url: self.membership_url,
            acl_backend: self.acl_backend,
            acl_file: self.acl_file,
            base_interval_secs: self.base_interval_secs,
            jitter_secs: self.jitter_secs,
            rng_seed: self.rng_seed,
            listen_address: self.listen_address,
            listen_port: self.listen_port,
            disable_api: self.disable_api,
        })
    }
}

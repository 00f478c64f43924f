use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aclsync::acl::{AclStore, InMemoryAclStore, JsonFileAclStore};
use aclsync::membership::{HttpMembership, MembershipSource, StaticMembership};
use aclsync::reconcile::ReconciliationEngine;
use aclsync::role::{RackSeedClassifier, Role, RoleClassifier, StaticRole};
use aclsync::runner::{select_schedule, SyncJob};
use aclsync::schedule::ScheduleSelector;
use aclsync::settings::{BackendKind, RoleMode, Settings};
use aclsync::{api, cli};

fn init_tracing(json_logs: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "aclsync=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn membership_source(settings: &Settings) -> anyhow::Result<Arc<dyn MembershipSource>> {
    let source: Arc<dyn MembershipSource> = match &settings.membership_url {
        Some(url) => Arc::new(HttpMembership::new(url.clone())?),
        None => Arc::new(StaticMembership::new(settings.members.clone())),
    };
    Ok(source)
}

fn acl_store(settings: &Settings) -> Arc<dyn AclStore> {
    match settings.acl_backend {
        BackendKind::Memory => Arc::new(InMemoryAclStore::new()),
        BackendKind::File => Arc::new(JsonFileAclStore::new(settings.acl_file.clone())),
    }
}

fn role_classifier(
    settings: &Settings,
    membership: Arc<dyn MembershipSource>,
) -> Box<dyn RoleClassifier> {
    match settings.role {
        RoleMode::Seed => Box::new(StaticRole(Role::Seed)),
        RoleMode::Peer => Box::new(StaticRole(Role::Peer)),
        RoleMode::Auto => Box::new(RackSeedClassifier::new(
            settings.app_name.clone(),
            settings.local_member(),
            membership,
        )),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse args and env vars
    let args = cli::Cli::parse();
    init_tracing(args.json_logs);
    let settings = args.into_settings()?;

    let membership = membership_source(&settings)?;
    let acls = acl_store(&settings);
    let engine = Arc::new(ReconciliationEngine::new(
        settings.app_name.clone(),
        Arc::new(settings.clone()),
        membership.clone(),
        acls,
    ));

    // Role is decided once for the lifetime of the process
    let classifier = role_classifier(&settings, membership);
    let selector = ScheduleSelector::new(settings.base_interval(), settings.jitter_range());
    let (role, schedule) =
        select_schedule(classifier.as_ref(), &selector, &settings.local_member())
            .await
            .context("selecting reconciliation schedule")?;

    let rng = match settings.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let (job, handle) = SyncJob::new(engine, role, schedule, rng);
    let job_task = tokio::spawn(job.run());

    if settings.disable_api {
        if schedule.is_periodic() {
            shutdown_signal().await;
            handle.shutdown();
        } else {
            // run-once job ends after its startup pass once nobody can trigger it
            drop(handle);
        }
        job_task.await.context("sync job panicked")?;
        return Ok(());
    }

    let listen_address: IpAddr = settings
        .listen_address
        .parse::<IpAddr>()
        .with_context(|| format!("Invalid ip address: {}", settings.listen_address))?;
    let socket_address = SocketAddr::from((listen_address, settings.listen_port));

    info!("Starting aclsync admin API on {}", socket_address);
    axum::Server::bind(&socket_address)
        .serve(api::api(handle.clone()).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    handle.shutdown();
    job_task.await.context("sync job panicked")?;
    Ok(())
}

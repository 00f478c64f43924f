//! Keeps the access-control rules of a cluster in step with its membership.
//!
//! A periodic, idempotent reconciliation job reads the cluster roster and the
//! ACL backend, then adds the ranges of new members and removes those of
//! departed members (and of ports no longer configured).
pub mod acl;
pub mod api;
pub mod cli;
pub mod error;
pub mod membership;
pub mod ports;
pub mod reconcile;
pub mod role;
pub mod runner;
pub mod schedule;
pub mod settings;

//! teamsplit - two-team balancing bot for a Discord guild
//!
//! New members are placed in whichever of two role-backed teams is smaller,
//! with a coin flip on ties. Slash commands assign everyone still
//! unassigned, list a team, show the balance and strip both roles.
//!
//! - [`balancer`]: the pure choice between two counts
//! - [`gateway`]: the guild as system of record, behind a trait
//! - [`service`]: assignment, reporting and reset over the gateway
//! - [`commands`]: name → command table and dispatch
//! - [`shard`], [`interaction`], [`health`]: the Discord runtime

pub mod balancer;
pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod health;
pub mod interaction;
pub mod metrics;
pub mod report;
pub mod service;
pub mod shard;
pub mod team;

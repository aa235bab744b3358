//! kubectl-smart: a read-only Kubernetes diagnostic plugin. `ClusterClient`
//! is the boundary to the cluster API; `Collectors` fetch what a command
//! needs; `Parsers` turn raw JSON into typed records; `GraphBuilder`,
//! `ScoringEngine`, and `Forecaster` turn those records into a dependency
//! graph, scored issues, and capacity/certificate forecasts; `Renderer`
//! turns those into human or machine output. `orchestrator` wires the
//! pipeline together per command.

pub mod cli;
pub mod cluster;
pub mod collectors;
pub mod config;
pub mod errors;
pub mod forecast;
pub mod graph;
pub mod model;
pub mod orchestrator;
pub mod parsers;
pub mod render;
pub mod scoring;

//! Run an untrained policy on a batch of GridForage worlds and print the
//! outcome.
//!
//! `RUST_LOG=debug cargo run --example forage` shows every step.

use metta::prelude::*;
use metta_envs::{GridForage, GridForageConfig};
use tracing_subscriber::EnvFilter;

fn main() -> metta::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let env_config = GridForageConfig {
        multi_discrete: true,
        ..Default::default()
    };
    let backend = Parallel::new(|| GridForage::new(env_config.clone()), 8);

    let policy = PolicyModule::new(
        &backend.observation_space(),
        &backend.action_space(),
        &GridForage::grid_features(),
        &GridForage::global_features(),
        &WeightTransforms::new(),
        PolicyConfig::default(),
        Device::Cpu,
    )?;

    let mut sim = Simulator::new(
        SimulatorConfig::default().with_log_interval(100),
        &policy,
        backend,
    )?
    .with_logger(Box::new(ConsoleLogger::with_prefix("forage")));

    let termination = sim.run()?;
    println!("{termination:?} after {} steps", sim.steps());
    println!("total rewards: {:?}", sim.total_rewards());
    for (name, value) in sim.stats().user_stats(5) {
        println!("{name:>24} {value:.3}");
    }
    if let Some(frame) = sim.backend().env(0).and_then(|env| env.render()) {
        println!("{frame}");
    }
    Ok(())
}

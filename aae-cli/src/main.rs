// Copyright 2026 Assessment Aggregation Engine Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Assessment Aggregation Engine demo CLI.
//!
//! Wires `aae-core` against a bundled in-memory fixture store and
//! exercises `compute` and the dependency cache end to end.

mod config;
mod fixture;

use aae_core::{
    compute, ComputeOptions, DependencyCache, EngineContext, EntityId, Level, ResultCache,
    RuleCatalog, UserId,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "aae")]
#[command(about = "Assessment Aggregation Engine demo CLI", long_about = None)]
struct Cli {
    /// Optional TOML config file (max_fanout, log_filter).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output as JSON (machine-readable).
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the bundled fixture's lesson metric for one user.
    Lesson {
        #[arg(long, default_value = "u1")]
        user: String,
    },

    /// Compute the bundled fixture's namespace metric for one user.
    Namespace {
        #[arg(long, default_value = "u1")]
        user: String,
    },

    /// Run the dependency cache's auto-compute propagation for one user
    /// and print the persisted completions map.
    Propagate {
        #[arg(long, default_value = "u1")]
        user: String,
    },

    /// List the rules registered in the built-in catalog.
    Rules,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::CliConfig::load(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(config.log_filter.clone()))
        .init();

    match cli.command {
        Commands::Lesson { user } => run_lesson(&config, &user, cli.json).await,
        Commands::Namespace { user } => run_namespace(&config, &user, cli.json).await,
        Commands::Propagate { user } => run_propagate(&config, &user, cli.json).await,
        Commands::Rules => {
            print_rules(cli.json);
            Ok(())
        }
    }
}

fn build_context(config: &config::CliConfig) -> EngineContext {
    let fx = fixture::build();
    EngineContext::new(
        fx.entities,
        fx.events,
        fx.users,
        Arc::new(RuleCatalog::with_builtins()),
        config.max_fanout,
    )
}

async fn run_lesson(config: &config::CliConfig, user: &str, json: bool) -> Result<()> {
    let ctx = build_context(config);
    let cache = ResultCache::new(config.cache_ttl_secs, 10_000);
    let lesson_id = EntityId::new(fixture::LESSON_ID);
    let lesson = ctx
        .entities
        .get_entity(Level::Lesson, &lesson_id)
        .await
        .context("fetching fixture lesson entity")?;
    let metric = lesson
        .metric_named(&aae_core::MetricName::new(fixture::LESSON_METRIC))
        .cloned()
        .context("fixture lesson metric missing")?;

    let users = vec![UserId::new(user)];
    let key = ResultCache::key(&lesson_id, &metric.name, &users);
    let result = match cache.get(&key).await {
        Some(cached) => cached,
        None => {
            let computed =
                compute(&ctx, &lesson_id, &metric, &users, &ComputeOptions::default()).await?;
            cache.set(key, computed.clone()).await;
            computed
        }
    };
    print_instance(user, result.get(&UserId::new(user)), json);
    Ok(())
}

async fn run_namespace(config: &config::CliConfig, user: &str, json: bool) -> Result<()> {
    let ctx = build_context(config);
    let cache = ResultCache::new(config.cache_ttl_secs, 10_000);
    let namespace_id = EntityId::new(fixture::NAMESPACE_ID);
    let namespace = ctx
        .entities
        .get_entity(Level::Namespace, &namespace_id)
        .await
        .context("fetching fixture namespace entity")?;
    let metric = namespace
        .metric_named(&aae_core::MetricName::new(fixture::NAMESPACE_METRIC))
        .cloned()
        .context("fixture namespace metric missing")?;

    let users = vec![UserId::new(user)];
    let key = ResultCache::key(&namespace_id, &metric.name, &users);
    let result = match cache.get(&key).await {
        Some(cached) => cached,
        None => {
            let computed =
                compute(&ctx, &namespace_id, &metric, &users, &ComputeOptions::default()).await?;
            cache.set(key, computed.clone()).await;
            computed
        }
    };
    print_instance(user, result.get(&UserId::new(user)), json);
    Ok(())
}

async fn run_propagate(config: &config::CliConfig, user: &str, json: bool) -> Result<()> {
    let ctx = build_context(config);
    let cache = DependencyCache::new();
    let user_id = UserId::new(user);

    let completions = cache
        .update_auto_computes(
            &ctx,
            &user_id,
            &aae_core::MetricName::new(fixture::COMPONENT_METRIC),
            &EntityId::new(fixture::LESSON_ID),
            &EntityId::new(fixture::NAMESPACE_ID),
        )
        .await?;

    info!(user = %user, key_count = completions.completions.len(), "propagation complete");
    if json {
        println!("{}", serde_json::to_string_pretty(&completions.completions)?);
    } else {
        for (key, instance) in &completions.completions {
            println!("{key} => score={} time={:?}", instance.score, instance.time);
        }
    }
    Ok(())
}

fn print_instance(user: &str, instance: Option<&aae_core::Instance>, json: bool) {
    let Some(instance) = instance else {
        eprintln!("no result for user {user}");
        return;
    };
    if json {
        println!("{}", serde_json::to_string_pretty(instance).unwrap());
    } else {
        println!(
            "user={user} score={} time={:?} provenance_len={}",
            instance.score,
            instance.time,
            instance.provenance.as_ref().map(|p| p.len()).unwrap_or(0)
        );
    }
}

fn print_rules(json: bool) {
    let catalog = RuleCatalog::with_builtins();
    let infos = catalog.describe();
    if json {
        #[derive(serde::Serialize)]
        struct RuleOut {
            name: String,
            description: String,
        }
        let out: Vec<RuleOut> = infos
            .into_iter()
            .map(|i| RuleOut {
                name: i.name,
                description: i.description,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out).unwrap());
    } else {
        for info in infos {
            println!("{:<20} {}", info.name, info.description);
        }
    }
}

// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod plugins;
pub mod runtime;
pub mod service;
pub mod session;
pub mod state;
pub mod topology;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use tracing::{debug, info};

use crate::cli::{CliArgs, OutputFormat};
use crate::config::{load_and_validate, parse_duration, ConfigFile};
use crate::engine::Engine;
use crate::runtime::{DeviceRuntime, LocalRuntime};
use crate::service::{CommandLoop, ControlService, ReplyControlService, TextControlService};

/// High-level entry point used by `main.rs`.
///
/// Wires together config, the local device runtime, resource plugins,
/// request triggers, the engine, the reply adapter selected by `--output`
/// and the command loop (batch or interactive).
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let timeout = match &args.timeout {
        Some(s) => parse_duration(s).map_err(|e| anyhow!("--timeout: {e}"))?,
        None => cfg.timeout(),
    };
    let delay = match &args.delay {
        Some(s) => parse_duration(s).map_err(|e| anyhow!("--delay: {e}"))?,
        None => cfg.delay(),
    };
    let partitions = if args.partitions.is_empty() {
        cfg.cli.partitions.clone()
    } else {
        args.partitions.clone()
    };
    let cmds = if args.cmds.is_empty() {
        cfg.cli.commands.clone()
    } else {
        args.cmds.clone()
    };
    let batch = args.batch || !cmds.is_empty();
    if batch && cmds.is_empty() {
        bail!("batch mode needs at least one command (--cmds or [cli].commands)");
    }

    let runtime: Arc<dyn DeviceRuntime> = Arc::new(LocalRuntime::new());
    let engine = Arc::new(
        Engine::builder(runtime)
            .plugins(cfg.plugin_dispatcher())
            .triggers(cfg.request_triggers())
            .default_timeout(timeout)
            .build(),
    );
    info!(
        plugins = ?engine.plugin_names(),
        ?partitions,
        timeout_ms = timeout.as_millis() as u64,
        "topoctl engine ready"
    );

    let mut params = cfg.command_params();
    params.timeout = timeout;

    match args.output {
        OutputFormat::Text => {
            let service = TextControlService::new(engine);
            drive(CommandLoop::new(service, partitions, params), batch, &cmds, delay).await
        }
        OutputFormat::Json => {
            let service = ReplyControlService::new(engine);
            drive(CommandLoop::new(service, partitions, params), batch, &cmds, delay).await
        }
    }
}

async fn drive<S: ControlService>(
    command_loop: CommandLoop<S>,
    batch: bool,
    cmds: &[String],
    delay: Duration,
) -> Result<()> {
    if batch {
        let mut stdout = std::io::stdout();
        command_loop.run_batch(cmds, delay, &mut stdout).await
    } else {
        command_loop.run_interactive().await
    }
}

/// Print the validated config without executing any request.
fn print_dry_run(cfg: &ConfigFile) {
    println!("topoctl dry-run");
    println!("  config.timeout = {} ms", cfg.timeout().as_millis());
    println!("  cli.delay = {} ms", cfg.delay().as_millis());
    println!("  cli.partitions = {:?}", cfg.cli.partitions);
    println!();

    println!("plugins ({}):", cfg.plugin.len());
    for (name, plugin) in &cfg.plugin {
        println!("  - {name}: {}", plugin.cmd);
    }

    println!("triggers ({}):", cfg.trigger.len());
    for (kind, trigger) in &cfg.trigger {
        println!("  - {kind}: {}", trigger.cmd);
    }

    println!("selectors ({}):", cfg.selector.len());
    for (name, selector) in &cfg.selector {
        println!("  - {name}: {}", selector.path);
    }

    let req = &cfg.request;
    println!("requests:");
    if !req.initialize.session.is_empty() {
        println!("  initialize.session: {}", req.initialize.session);
    }
    if !req.submit.plugin.is_empty() {
        println!("  submit.plugin: {}", req.submit.plugin);
        println!("  submit.resources: {}", req.submit.resources);
    }
    for (name, section) in [
        ("activate", &req.activate),
        ("upscale", &req.upscale),
        ("downscale", &req.downscale),
    ] {
        if !section.topology.is_empty() {
            println!("  {name}.topology: {}", section.topology);
        } else if !section.content.is_empty() {
            println!("  {name}.content: <inline>");
        } else if !section.script.is_empty() {
            println!("  {name}.script: {}", section.script);
        }
    }
    if !req.properties.properties.is_empty() {
        println!("  properties: {:?}", req.properties.properties);
    }

    if !cfg.cli.commands.is_empty() {
        println!("commands: {:?}", cfg.cli.commands);
    }

    debug!("dry-run complete (no execution)");
}

// src/service/command_loop.rs

//! Line-oriented command loop shared by every [`ControlService`].
//!
//! Each command line is sent to every configured partition in turn. The
//! request parameters come from configuration ([`CommandParams`]); the
//! command line only picks the request and, for device commands, which
//! devices to target.

use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::service::ControlService;
use crate::types::{
    ActivateParams, CommonParams, DeviceParams, InitializeParams, PartitionId, RunNr,
    SetPropertiesParams, StatusParams, SubmitParams, UpdateParams,
};

pub const HELP: &str = "\
Available commands:
  .quit - Quit the program.
  .init - Initialization request.
  .submit - Submit request.
  .activate - Activate request.
  .run - Run request.
  .prop - Set properties request.
  .upscale - Upscale topology request.
  .downscale - Downscale topology request.
  .state [all|<selector>] - Get state request.
  .config [all|<selector>] - Configure request.
  .start [all|<selector>] - Start request.
  .stop [all|<selector>] - Stop request.
  .reset [all|<selector>] - Reset request.
  .term [all|<selector>] - Terminate request.
  .down - Shutdown request.
  .status - Status of all partitions.
";

/// Request parameters used by the loop, typically loaded from config.
#[derive(Debug, Clone, Default)]
pub struct CommandParams {
    pub initialize: InitializeParams,
    pub submit: SubmitParams,
    pub activate: ActivateParams,
    pub upscale: UpdateParams,
    pub downscale: UpdateParams,
    pub properties: SetPropertiesParams,
    /// Named device selectors: name -> device path regex.
    pub selectors: BTreeMap<String, String>,
    /// Ask for per-device detail on device commands.
    pub detailed: bool,
    pub run_nr: RunNr,
    /// Zero means the engine default.
    pub timeout: Duration,
}

impl CommandParams {
    /// Device params for `target`: `all`, a named selector, or a raw regex.
    pub fn device_params(&self, target: Option<&str>) -> DeviceParams {
        let path = match target.map(str::trim) {
            None | Some("") | Some("all") => String::new(),
            Some(name) => match self.selectors.get(name) {
                Some(path) => path.clone(),
                None => name.to_string(),
            },
        };
        DeviceParams {
            path,
            detailed: self.detailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Initialize,
    Submit,
    Activate,
    Run,
    SetProperties,
    Upscale,
    Downscale,
    GetState(Option<String>),
    Configure(Option<String>),
    Start(Option<String>),
    Stop(Option<String>),
    Reset(Option<String>),
    Terminate(Option<String>),
    Shutdown,
    Status,
}

impl Command {
    /// Parse one command line. `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let mut words = line.split_whitespace();
        let Some(cmd) = words.next() else {
            return Ok(None);
        };
        let target = words.next().map(str::to_string);

        let command = match cmd {
            ".quit" => Command::Quit,
            ".init" => Command::Initialize,
            ".submit" => Command::Submit,
            ".activate" => Command::Activate,
            ".run" => Command::Run,
            ".prop" => Command::SetProperties,
            ".upscale" => Command::Upscale,
            ".downscale" => Command::Downscale,
            ".state" => Command::GetState(target),
            ".config" => Command::Configure(target),
            ".start" => Command::Start(target),
            ".stop" => Command::Stop(target),
            ".reset" => Command::Reset(target),
            ".term" => Command::Terminate(target),
            ".down" => Command::Shutdown,
            ".status" => Command::Status,
            other => return Err(format!("Unknown command {other}")),
        };
        Ok(Some(command))
    }
}

/// Whether the loop should keep reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct CommandLoop<S: ControlService> {
    service: S,
    partitions: Vec<PartitionId>,
    params: CommandParams,
}

impl<S: ControlService> CommandLoop<S> {
    pub fn new(service: S, partitions: Vec<PartitionId>, params: CommandParams) -> Self {
        Self {
            service,
            partitions,
            params,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    fn common(&self, partition_id: &str) -> CommonParams {
        CommonParams::new(partition_id, self.params.run_nr, self.params.timeout)
    }

    /// Send one partition-scoped command. `None` for `.quit` and `.status`.
    pub async fn dispatch(&self, partition_id: &str, command: &Command) -> Option<S::Reply> {
        let common = self.common(partition_id);
        let p = &self.params;
        let s = &self.service;

        let reply = match command {
            Command::Quit | Command::Status => return None,
            Command::Initialize => s.initialize(&common, &p.initialize).await,
            Command::Submit => s.submit(&common, &p.submit).await,
            Command::Activate => s.activate(&common, &p.activate).await,
            Command::Run => s.run(&common, &p.initialize, &p.submit, &p.activate).await,
            Command::SetProperties => s.set_properties(&common, &p.properties).await,
            Command::Upscale => s.upscale(&common, &p.upscale).await,
            Command::Downscale => s.downscale(&common, &p.downscale).await,
            Command::GetState(t) => s.get_state(&common, &p.device_params(t.as_deref())).await,
            Command::Configure(t) => s.configure(&common, &p.device_params(t.as_deref())).await,
            Command::Start(t) => s.start(&common, &p.device_params(t.as_deref())).await,
            Command::Stop(t) => s.stop(&common, &p.device_params(t.as_deref())).await,
            Command::Reset(t) => s.reset(&common, &p.device_params(t.as_deref())).await,
            Command::Terminate(t) => s.terminate(&common, &p.device_params(t.as_deref())).await,
            Command::Shutdown => s.shutdown(&common).await,
        };
        Some(reply)
    }

    /// Execute one command line for every partition, writing replies to `out`.
    pub async fn process<W: Write>(&self, line: &str, out: &mut W) -> Result<Flow> {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Flow::Continue),
            Err(msg) => {
                warn!(line = %line.trim(), "unknown command");
                writeln!(out, "{msg}")?;
                return Ok(Flow::Continue);
            }
        };

        match &command {
            Command::Quit => return Ok(Flow::Quit),
            Command::Status => {
                let reply = self.service.status(&StatusParams::default()).await;
                writeln!(out, "Reply: (\n{reply})")?;
            }
            _ => {
                for partition_id in &self.partitions {
                    writeln!(out, "Requests for partition ID <{partition_id}>")?;
                    if let Some(reply) = self.dispatch(partition_id, &command).await {
                        writeln!(out, "Reply: (\n{reply})")?;
                    }
                }
            }
        }
        out.flush()?;
        Ok(Flow::Continue)
    }

    /// Execute `cmds` in order with `delay` between them.
    pub async fn run_batch<W: Write>(
        &self,
        cmds: &[String],
        delay: Duration,
        out: &mut W,
    ) -> Result<()> {
        for (idx, cmd) in cmds.iter().enumerate() {
            info!(command = %cmd, "executing batch command");
            writeln!(out, "Executing command \"{cmd}\"")?;
            if self.process(cmd, out).await? == Flow::Quit {
                break;
            }
            if idx + 1 < cmds.len() && !delay.is_zero() {
                debug!(delay_ms = delay.as_millis() as u64, "waiting before next command");
                tokio::time::sleep(delay).await;
            }
        }
        Ok(())
    }

    /// Read commands from stdin until `.quit`, EOF or Ctrl+C.
    pub async fn run_interactive(&self) -> Result<()> {
        let mut stdout = std::io::stdout();
        write!(stdout, "{HELP}")?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            write!(stdout, "Please enter command: ")?;
            stdout.flush()?;

            let line = tokio::select! {
                line = lines.next_line() => line.context("reading command from stdin")?,
                _ = tokio::signal::ctrl_c() => {
                    info!("received Ctrl+C; leaving command loop");
                    break;
                }
            };
            let Some(line) = line else {
                break;
            };
            if self.process(&line, &mut stdout).await? == Flow::Quit {
                break;
            }
        }
        Ok(())
    }
}

// src/state/lifecycle.rs

use std::fmt;

/// Lifecycle state reported by a single device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceLifecycle {
    Undefined,
    Ok,
    Error,
    Idle,
    InitializingDevice,
    Initialized,
    Bound,
    DeviceReady,
    Ready,
    Running,
    ResettingTask,
    ResettingDevice,
    Exiting,
}

impl DeviceLifecycle {
    pub fn name(self) -> &'static str {
        match self {
            DeviceLifecycle::Undefined => "UNDEFINED",
            DeviceLifecycle::Ok => "OK",
            DeviceLifecycle::Error => "ERROR",
            DeviceLifecycle::Idle => "IDLE",
            DeviceLifecycle::InitializingDevice => "INITIALIZING DEVICE",
            DeviceLifecycle::Initialized => "INITIALIZED",
            DeviceLifecycle::Bound => "BOUND",
            DeviceLifecycle::DeviceReady => "DEVICE READY",
            DeviceLifecycle::Ready => "READY",
            DeviceLifecycle::Running => "RUNNING",
            DeviceLifecycle::ResettingTask => "RESETTING TASK",
            DeviceLifecycle::ResettingDevice => "RESETTING DEVICE",
            DeviceLifecycle::Exiting => "EXITING",
        }
    }
}

impl fmt::Display for DeviceLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Single-step device state transition, as accepted by the process runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    InitDevice,
    CompleteInit,
    Bind,
    Connect,
    InitTask,
    Run,
    Stop,
    ResetTask,
    ResetDevice,
    End,
}

impl Transition {
    /// State a device must be in for the transition to be legal.
    pub fn from(self) -> DeviceLifecycle {
        match self {
            Transition::InitDevice => DeviceLifecycle::Idle,
            Transition::CompleteInit => DeviceLifecycle::InitializingDevice,
            Transition::Bind => DeviceLifecycle::Initialized,
            Transition::Connect => DeviceLifecycle::Bound,
            Transition::InitTask => DeviceLifecycle::DeviceReady,
            Transition::Run => DeviceLifecycle::Ready,
            Transition::Stop => DeviceLifecycle::Running,
            Transition::ResetTask => DeviceLifecycle::Ready,
            Transition::ResetDevice => DeviceLifecycle::DeviceReady,
            Transition::End => DeviceLifecycle::Idle,
        }
    }

    /// State the device ends up in after the transition.
    pub fn to(self) -> DeviceLifecycle {
        match self {
            Transition::InitDevice => DeviceLifecycle::InitializingDevice,
            Transition::CompleteInit => DeviceLifecycle::Initialized,
            Transition::Bind => DeviceLifecycle::Bound,
            Transition::Connect => DeviceLifecycle::DeviceReady,
            Transition::InitTask => DeviceLifecycle::Ready,
            Transition::Run => DeviceLifecycle::Running,
            Transition::Stop => DeviceLifecycle::Ready,
            Transition::ResetTask => DeviceLifecycle::DeviceReady,
            Transition::ResetDevice => DeviceLifecycle::Idle,
            Transition::End => DeviceLifecycle::Exiting,
        }
    }

    /// Apply the transition to `state`, or `None` if it is illegal there.
    pub fn apply(self, state: DeviceLifecycle) -> Option<DeviceLifecycle> {
        (state == self.from()).then(|| self.to())
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Transition::InitDevice => "INIT DEVICE",
            Transition::CompleteInit => "COMPLETE INIT",
            Transition::Bind => "BIND",
            Transition::Connect => "CONNECT",
            Transition::InitTask => "INIT TASK",
            Transition::Run => "RUN",
            Transition::Stop => "STOP",
            Transition::ResetTask => "RESET TASK",
            Transition::ResetDevice => "RESET DEVICE",
            Transition::End => "END",
        };
        f.write_str(name)
    }
}

/// Client-facing lifecycle command, expanded into a fixed transition sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleCommand {
    Configure,
    Start,
    Stop,
    Reset,
    Terminate,
}

impl LifecycleCommand {
    pub fn transitions(self) -> &'static [Transition] {
        match self {
            LifecycleCommand::Configure => &[
                Transition::InitDevice,
                Transition::CompleteInit,
                Transition::Bind,
                Transition::Connect,
                Transition::InitTask,
            ],
            LifecycleCommand::Start => &[Transition::Run],
            LifecycleCommand::Stop => &[Transition::Stop],
            LifecycleCommand::Reset => &[Transition::ResetTask, Transition::ResetDevice],
            LifecycleCommand::Terminate => &[Transition::End],
        }
    }

    pub fn target(self) -> DeviceLifecycle {
        match self {
            LifecycleCommand::Configure => DeviceLifecycle::Ready,
            LifecycleCommand::Start => DeviceLifecycle::Running,
            LifecycleCommand::Stop => DeviceLifecycle::Ready,
            LifecycleCommand::Reset => DeviceLifecycle::Idle,
            LifecycleCommand::Terminate => DeviceLifecycle::Exiting,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LifecycleCommand::Configure => "Configure",
            LifecycleCommand::Start => "Start",
            LifecycleCommand::Stop => "Stop",
            LifecycleCommand::Reset => "Reset",
            LifecycleCommand::Terminate => "Terminate",
        }
    }
}

//! Command loop around a [`Pipeline`].

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, info, instrument, warn};

use streamkit_ipc::{BuildPhase, PipelineCommand, PipelineEvent, PipelineState};

use crate::orchestrator::Pipeline;

/// Runs a pipeline on its own thread, driven by [`PipelineCommand`]s.
pub struct PipelineService {
    pipeline: Pipeline,
    command_rx: Receiver<PipelineCommand>,
    event_tx: Sender<PipelineEvent>,
    state: PipelineState,
}

impl PipelineService {
    pub fn new(
        pipeline: Pipeline,
        command_rx: Receiver<PipelineCommand>,
        event_tx: Sender<PipelineEvent>,
    ) -> Self {
        Self {
            pipeline,
            command_rx,
            event_tx,
            state: PipelineState::Uninitialized,
        }
    }

    /// Initialize the pipeline, then serve commands until shutdown (blocking).
    #[instrument(name = "pipeline_service_run", skip(self))]
    pub fn run(&mut self) {
        info!("Pipeline service starting");
        self.initialize();
        self.send_event(PipelineEvent::Ready);

        loop {
            match self.command_rx.recv() {
                Ok(command) => {
                    if !self.handle_command(command) {
                        break;
                    }
                }
                Err(_) => {
                    info!("Command channel disconnected, shutting down");
                    break;
                }
            }
        }

        info!("Pipeline service stopped");
    }

    /// Current state.
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// The managed pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn initialize(&mut self) {
        let event_tx = &self.event_tx;
        let mut state = self.state.clone();
        let result = self.pipeline.startup_with(&mut |phase: BuildPhase| {
            let next = PipelineState::Building { phase };
            publish(
                event_tx,
                PipelineEvent::StateChanged {
                    previous: Box::new(std::mem::replace(&mut state, next.clone())),
                    current: Box::new(next),
                },
            );
        });
        self.state = state;

        match result {
            Ok(()) => match self.pipeline.output_id() {
                Some(output_id) => {
                    let output_id = output_id.to_string();
                    self.transition_to(PipelineState::Idle { output_id });
                }
                None => self.fail("Pipeline has no output after startup".to_string(), false),
            },
            Err(e) => {
                error!("Pipeline startup failed: {}", e);
                self.fail(e.to_string(), false);
            }
        }
    }

    /// Handle a command. Returns false if the service should stop.
    fn handle_command(&mut self, command: PipelineCommand) -> bool {
        debug!(?command, "Handling command");

        match command {
            PipelineCommand::Start => self.start(),
            PipelineCommand::Stop => self.stop(),
            PipelineCommand::GetState => self.send_state(),
            PipelineCommand::Shutdown => {
                self.stop();
                self.send_event(PipelineEvent::Shutdown);
                return false;
            }
        }

        true
    }

    #[instrument(name = "start_output", skip(self))]
    fn start(&mut self) {
        let output_id = match &self.state {
            PipelineState::Idle { output_id } => output_id.clone(),
            PipelineState::Live { .. } => {
                debug!("Already live, ignoring start command");
                return;
            }
            other => {
                warn!(state = other.name(), "Cannot start in this state");
                self.send_error(format!("Cannot start while {}", other.name()), true);
                return;
            }
        };

        match self.pipeline.start() {
            Ok(()) => {
                info!(output = %output_id, "Output started");
                self.transition_to(PipelineState::Live { output_id });
            }
            Err(e) => {
                error!("Output start failed: {}", e);
                self.send_error(e.to_string(), true);
            }
        }
    }

    #[instrument(name = "stop_output", skip(self))]
    fn stop(&mut self) {
        let output_id = match &self.state {
            PipelineState::Live { output_id } => output_id.clone(),
            _ => {
                debug!("Not live, ignoring stop command");
                return;
            }
        };

        match self.pipeline.stop() {
            Ok(()) => {
                info!(output = %output_id, "Output stopped");
                self.transition_to(PipelineState::Idle { output_id });
            }
            Err(e) => {
                error!("Output stop failed: {}", e);
                self.send_error(e.to_string(), true);
            }
        }
    }

    fn send_state(&self) {
        self.send_event(PipelineEvent::StateChanged {
            previous: Box::new(self.state.clone()),
            current: Box::new(self.state.clone()),
        });
    }

    fn fail(&mut self, message: String, recoverable: bool) {
        self.transition_to(PipelineState::Error {
            message: message.clone(),
            recoverable,
        });
        self.send_error(message, recoverable);
    }

    fn send_error(&self, message: String, recoverable: bool) {
        self.send_event(PipelineEvent::Error {
            recoverable,
            message,
        });
    }

    fn transition_to(&mut self, new_state: PipelineState) {
        let previous = std::mem::replace(&mut self.state, new_state.clone());

        debug!(
            previous = %previous.name(),
            current = %new_state.name(),
            "State transition"
        );

        self.send_event(PipelineEvent::StateChanged {
            previous: Box::new(previous),
            current: Box::new(new_state),
        });
    }

    fn send_event(&self, event: PipelineEvent) {
        publish(&self.event_tx, event);
    }
}

fn publish(event_tx: &Sender<PipelineEvent>, event: PipelineEvent) {
    if let Err(e) = event_tx.try_send(event) {
        warn!("Failed to send event: {}", e);
    }
}

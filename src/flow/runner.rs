use std::{future::Future, io};

use anyhow::{Result, bail};
use tokio::signal;
use tracing::{debug, warn};

use super::{Effect, Event, Flow, FlowState, Processor};
use crate::aws::CloudGateway;
use crate::driver::AuthDriver;

/// A line of a selection prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub title: String,
    pub description: String,
}

impl Choice {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Operator interaction used by the login flow.
/// `Ok(None)` means the operator cancelled.
pub trait Prompter {
    fn select(&mut self, prompt: &str, choices: &[Choice]) -> Result<Option<usize>>;

    fn input_code(&mut self, notice: Option<&str>) -> Result<Option<String>>;

    /// Show that a background call is running
    fn start_busy(&mut self, message: &str);

    fn stop_busy(&mut self);
}

/// Drives a [`Flow`] to completion, performing its effects
pub struct Runner<'a, P, G: ?Sized> {
    flow: Flow<'a>,
    processor: Processor<'a, G>,
    prompter: P,
}

impl<'a, P: Prompter, G: CloudGateway + ?Sized> Runner<'a, P, G> {
    pub fn new(flow: Flow<'a>, processor: Processor<'a, G>, prompter: P) -> Self {
        Self {
            flow,
            processor,
            prompter,
        }
    }

    /// Run until the flow quits and return its final state
    pub async fn run(mut self) -> Result<FlowState> {
        let mut state = FlowState::default();
        let mut event = Event::Start;

        loop {
            let (next, effect) = self.flow.transition(state, event);
            state = next;

            event = match effect {
                Effect::SelectProfile(profiles) => {
                    let choices: Vec<Choice> = profiles
                        .iter()
                        .map(|profile| Choice::new(profile.as_str(), ""))
                        .collect();
                    self.prompter
                        .select("Select AWS profile", &choices)?
                        .and_then(|index| profiles.get(index).cloned())
                        .map_or(Event::Quit, Event::ProfileSelected)
                }

                Effect::SelectDriver(drivers) => {
                    let choices: Vec<Choice> = drivers
                        .iter()
                        .map(|kind| Choice::new(kind.title(), kind.description()))
                        .collect();
                    self.prompter
                        .select("Select auth driver", &choices)?
                        .and_then(|index| drivers.get(index).copied())
                        .map_or(Event::Quit, Event::DriverSelected)
                }

                Effect::SelectRole(roles) => {
                    let choices: Vec<Choice> = roles
                        .iter()
                        .map(|role| Choice::new(role.title.as_str(), role.description.as_str()))
                        .collect();
                    self.prompter
                        .select("Select role", &choices)?
                        .and_then(|index| roles.get(index))
                        .map_or(Event::Quit, |choice| Event::RoleSelected(choice.role.clone()))
                }

                Effect::PromptCode { notice } => self
                    .prompter
                    .input_code(notice.as_deref())?
                    .map_or(Event::Quit, Event::CodeEntered),

                Effect::FetchCode(driver) => self.fetch_code(&driver).await,

                Effect::Process(request) => {
                    self.prompter.start_busy("Requesting AWS session credentials...");
                    let processed = until_interrupted(self.processor.run(&request)).await;
                    self.prompter.stop_busy();
                    processed.map_or(Event::Quit, Event::Processed)
                }

                Effect::Render(_) => Event::Quit,

                Effect::Exit => return Ok(state),

                Effect::Ignore => bail!("Login flow stalled at {:?}", state.step),
            };
        }
    }

    async fn fetch_code(&mut self, driver: &AuthDriver) -> Event {
        self.prompter
            .start_busy(&format!("Fetching MFA code with {}...", driver.kind().title()));
        let fetched = until_interrupted(driver.get_code()).await;
        self.prompter.stop_busy();
        fetched.map_or(Event::Quit, Event::CodeFetched)
    }
}

/// Await `call`. On Ctrl-C the call still runs to completion but its result
/// is dropped and `None` returned.
async fn until_interrupted<F: Future>(call: F) -> Option<F::Output> {
    race_interrupt(call, signal::ctrl_c()).await
}

async fn race_interrupt<F, I>(call: F, interrupt: I) -> Option<F::Output>
where
    F: Future,
    I: Future<Output = io::Result<()>>,
{
    tokio::pin!(call);

    tokio::select! {
        output = &mut call => Some(output),
        interrupted = interrupt => match interrupted {
            Ok(()) => {
                warn!("Interrupted, waiting for the running call to finish");
                let _ = call.await;
                debug!("Discarded result of the interrupted call");
                None
            }
            Err(e) => {
                warn!("Cannot listen for Ctrl-C: {}", e);
                Some(call.await)
            }
        },
    }
}

//! The login wizard as a pure state machine.
//!
//! [`Flow::transition`] maps `(FlowState, Event)` to the next state and the
//! [`Effect`] the caller must carry out. The effect's result comes back as
//! the next event; see [`runner`] for the loop that drives it.

pub mod processing;
pub mod runner;

use tracing::{debug, info, warn};

use crate::aws::CredentialStore;
use crate::constants::{DEFAULT_VAULT_CLI, MFA_CODE_LENGTH};
use crate::driver::{AuthDriver, DriverKind};
use crate::error::LoginError;

pub use processing::{ProcessRequest, Processor};
pub use runner::{Choice, Prompter, Runner};

const INVALID_CODE_NOTICE: &str = "Invalid MFA code - must be 6 digits";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Step {
    #[default]
    ProfileSelection,
    DriverSelection,
    RoleSelection,
    MfaInput,
    Processing,
    Done,
    Quit,
}

/// Result of a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFlowResult {
    /// Profile the active session acts as
    pub profile: String,
    pub registry_login: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(AuthFlowResult),
    Failure(String),
}

/// Working memory of the wizard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowState {
    pub step: Step,
    /// Current profile; rebound to the role owner after assumption
    pub profile: Option<String>,
    pub driver: Option<AuthDriver>,
    /// Role to assume; `None` continues as the profile itself
    pub role: Option<String>,
    pub mfa_code: Option<String>,
    /// Transient message shown at the MFA prompt
    pub notice: Option<String>,
    pub outcome: Option<Outcome>,
}

/// An entry of the role prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleChoice {
    pub title: String,
    pub description: String,
    pub role: Option<String>,
}

#[derive(Debug)]
pub enum Event {
    Start,
    ProfileSelected(String),
    DriverSelected(DriverKind),
    RoleSelected(Option<String>),
    CodeEntered(String),
    CodeFetched(Result<String, LoginError>),
    Processed(Result<AuthFlowResult, LoginError>),
    /// Cancel before Done, or leave Done
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SelectProfile(Vec<String>),
    SelectDriver(Vec<DriverKind>),
    SelectRole(Vec<RoleChoice>),
    PromptCode { notice: Option<String> },
    FetchCode(AuthDriver),
    Process(ProcessRequest),
    /// The flow reached Done with this outcome
    Render(Outcome),
    /// The flow reached Quit; nothing more to do
    Exit,
    /// The event does not apply to the current step
    Ignore,
}

/// Immutable context of the state machine
#[derive(Debug, Clone)]
pub struct Flow<'a> {
    store: &'a CredentialStore,
    profile: Option<String>,
    driver: Option<DriverKind>,
    installed_drivers: Vec<DriverKind>,
    vault_cli: String,
}

impl<'a> Flow<'a> {
    pub fn new(store: &'a CredentialStore) -> Self {
        Self {
            store,
            profile: None,
            driver: None,
            installed_drivers: vec![DriverKind::Manual],
            vault_cli: DEFAULT_VAULT_CLI.to_string(),
        }
    }

    /// Use `profile` without asking
    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    /// Use `driver` without asking
    pub fn with_driver(mut self, driver: Option<DriverKind>) -> Self {
        self.driver = driver;
        self
    }

    /// Drivers offered by the driver prompt
    pub fn with_installed_drivers(mut self, drivers: Vec<DriverKind>) -> Self {
        self.installed_drivers = drivers;
        self
    }

    pub fn with_vault_cli(mut self, vault_cli: impl Into<String>) -> Self {
        self.vault_cli = vault_cli.into();
        self
    }

    pub fn transition(&self, state: FlowState, event: Event) -> (FlowState, Effect) {
        debug!("{:?} <- {:?}", state.step, event_name(&event));

        match (state.step, event) {
            (Step::Quit, _) => (state, Effect::Exit),

            (Step::Done, Event::Quit) => (
                FlowState {
                    step: Step::Quit,
                    ..state
                },
                Effect::Exit,
            ),

            (_, Event::Quit) => {
                info!("Login cancelled at {:?}", state.step);
                (
                    FlowState {
                        step: Step::Quit,
                        ..state
                    },
                    Effect::Exit,
                )
            }

            (Step::ProfileSelection, Event::Start) => self.enter(state, Step::ProfileSelection),

            (Step::ProfileSelection, Event::ProfileSelected(profile)) => {
                self.select_profile(state, profile)
            }

            (Step::DriverSelection, Event::DriverSelected(kind)) => self.select_driver(state, kind),

            (Step::RoleSelection, Event::RoleSelected(role)) => {
                let role = role.filter(|role| !role.is_empty());
                self.enter(FlowState { role, ..state }, Step::MfaInput)
            }

            (Step::MfaInput, Event::CodeEntered(code)) => {
                if is_valid_mfa_code(&code) {
                    let state = FlowState {
                        mfa_code: Some(code),
                        notice: None,
                        ..state
                    };
                    self.enter(state, Step::Processing)
                } else {
                    debug!("Rejected MFA code input");
                    let notice = Some(INVALID_CODE_NOTICE.to_string());
                    (
                        FlowState {
                            notice: notice.clone(),
                            mfa_code: None,
                            ..state
                        },
                        Effect::PromptCode { notice },
                    )
                }
            }

            (Step::MfaInput, Event::CodeFetched(Ok(code))) => {
                let state = FlowState {
                    mfa_code: Some(code),
                    ..state
                };
                self.enter(state, Step::Processing)
            }

            (Step::MfaInput, Event::CodeFetched(Err(err))) => fail(state, err.to_string()),

            (Step::Processing, Event::Processed(Ok(result))) => {
                let outcome = Outcome::Success(result.clone());
                (
                    FlowState {
                        step: Step::Done,
                        profile: Some(result.profile),
                        outcome: Some(outcome.clone()),
                        ..state
                    },
                    Effect::Render(outcome),
                )
            }

            (Step::Processing, Event::Processed(Err(err))) => fail(state, err.to_string()),

            (step, event) => {
                warn!("Ignoring {} at {:?}", event_name(&event), step);
                (state, Effect::Ignore)
            }
        }
    }

    fn select_profile(&self, state: FlowState, profile: String) -> (FlowState, Effect) {
        info!("Selected profile: {}", profile);
        let state = FlowState {
            profile: Some(profile),
            ..state
        };
        self.enter(state, Step::DriverSelection)
    }

    fn select_driver(&self, state: FlowState, kind: DriverKind) -> (FlowState, Effect) {
        info!("Selected auth driver: {}", kind);
        let profile = state.profile.clone().unwrap_or_default();
        let driver = AuthDriver::for_profile(
            kind,
            &profile,
            self.store.credential(&profile),
            &self.vault_cli,
        );
        let state = FlowState {
            driver: Some(driver),
            ..state
        };
        self.enter(state, Step::RoleSelection)
    }

    /// Entry action of `step`. Steps that need no input advance on their own.
    fn enter(&self, state: FlowState, step: Step) -> (FlowState, Effect) {
        let state = FlowState { step, ..state };

        match step {
            Step::ProfileSelection => {
                if let Some(profile) = self.profile.clone() {
                    return self.select_profile(state, profile);
                }

                let profiles = self.store.valid_profiles();
                match profiles.len() {
                    0 => fail(
                        state,
                        "no valid profiles found, a profile needs aws_access_key_id, \
                         aws_secret_access_key and mfa_serial"
                            .to_string(),
                    ),
                    1 => {
                        let only = profiles.into_iter().next().unwrap_or_default();
                        self.select_profile(state, only)
                    }
                    _ => (state, Effect::SelectProfile(profiles)),
                }
            }

            Step::DriverSelection => match self.driver {
                Some(kind) => self.select_driver(state, kind),
                None => (
                    state,
                    Effect::SelectDriver(self.installed_drivers.clone()),
                ),
            },

            Step::RoleSelection => {
                let profile = state.profile.clone().unwrap_or_default();
                let roles = self.store.assumable_roles(&profile);
                if roles.is_empty() {
                    debug!("No assumable roles for {}, skipping role selection", profile);
                    return self.enter(state, Step::MfaInput);
                }
                (state, Effect::SelectRole(self.role_choices(&profile, roles)))
            }

            Step::MfaInput => match state.driver.clone().filter(AuthDriver::yields_code) {
                Some(driver) => (state, Effect::FetchCode(driver)),
                None => {
                    let notice = state.notice.clone();
                    (state, Effect::PromptCode { notice })
                }
            },

            Step::Processing => {
                let request = ProcessRequest {
                    profile: state.profile.clone().unwrap_or_default(),
                    role: state.role.clone(),
                    mfa_code: state.mfa_code.clone().unwrap_or_default(),
                };
                (state, Effect::Process(request))
            }

            Step::Done => match state.outcome.clone() {
                Some(outcome) => (state, Effect::Render(outcome)),
                None => (state, Effect::Exit),
            },

            Step::Quit => (state, Effect::Exit),
        }
    }

    fn role_choices(&self, profile: &str, roles: Vec<String>) -> Vec<RoleChoice> {
        let mut choices = vec![RoleChoice {
            title: profile.to_string(),
            description: format!("Continue as the current user: [{profile}]"),
            role: None,
        }];

        choices.extend(roles.into_iter().map(|role| {
            let role_name = role.rsplit(':').next().unwrap_or(&role).to_string();
            RoleChoice {
                title: self.store.profile_for_role(&role).to_string(),
                description: format!("Assume: [{role_name}]"),
                role: Some(role),
            }
        }));

        choices
    }
}

fn fail(state: FlowState, message: String) -> (FlowState, Effect) {
    warn!("Login failed: {}", message);
    let outcome = Outcome::Failure(message);
    (
        FlowState {
            step: Step::Done,
            outcome: Some(outcome.clone()),
            ..state
        },
        Effect::Render(outcome),
    )
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::Start => "Start",
        Event::ProfileSelected(_) => "ProfileSelected",
        Event::DriverSelected(_) => "DriverSelected",
        Event::RoleSelected(_) => "RoleSelected",
        Event::CodeEntered(_) => "CodeEntered",
        Event::CodeFetched(_) => "CodeFetched",
        Event::Processed(_) => "Processed",
        Event::Quit => "Quit",
    }
}

/// A TOTP code is exactly six ASCII digits
pub fn is_valid_mfa_code(code: &str) -> bool {
    code.len() == MFA_CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{manual::ManualDriver, vault::VaultDriver};

    const SINGLE: &str = "[default]
aws_access_key_id = AKIA
aws_secret_access_key = secret
mfa_serial = arn:aws:iam::123456789012:mfa/user
";

    const MANY: &str = "[prd]
aws_access_key_id = AKIAPRD
aws_secret_access_key = secret-prd
mfa_serial = arn:aws:iam::111111111111:mfa/prd
assumable_role_id = arn:aws:iam::111111111111:role/prd-role
vault_key = AWS prd

[int]
aws_access_key_id = AKIAINT
aws_secret_access_key = secret-int
mfa_serial = arn:aws:iam::222222222222:mfa/int
assumable_role_id = arn:aws:iam::222222222222:role/int-role

[dev]
aws_access_key_id = AKIADEV
aws_secret_access_key = secret-dev
mfa_serial = arn:aws:iam::333333333333:mfa/dev
";

    const ROLE_INT: &str = "arn:aws:iam::222222222222:role/int-role";

    fn start(flow: &Flow<'_>) -> (FlowState, Effect) {
        flow.transition(FlowState::default(), Event::Start)
    }

    #[test]
    fn test_is_valid_mfa_code() {
        for code in ["000000", "123456", "999999"] {
            assert!(is_valid_mfa_code(code), "{code} should be valid");
        }
        for code in ["", "12345", "1234567", "12345a", "123-45", "123 45", "١٢٣٤٥٦"] {
            assert!(!is_valid_mfa_code(code), "{code} should be invalid");
        }
    }

    #[test]
    fn test_single_profile_is_auto_selected() {
        let store = CredentialStore::from_content(SINGLE);
        let flow = Flow::new(&store);

        let (state, effect) = start(&flow);
        assert_eq!(state.step, Step::DriverSelection);
        assert_eq!(state.profile.as_deref(), Some("default"));
        assert_eq!(effect, Effect::SelectDriver(vec![DriverKind::Manual]));
    }

    #[test]
    fn test_multiple_profiles_are_prompted() {
        let store = CredentialStore::from_content(MANY);
        let flow = Flow::new(&store);

        let (state, effect) = start(&flow);
        assert_eq!(state.step, Step::ProfileSelection);
        assert_eq!(
            effect,
            Effect::SelectProfile(vec![
                "prd".to_string(),
                "int".to_string(),
                "dev".to_string()
            ])
        );
    }

    #[test]
    fn test_no_valid_profiles_fails() {
        let store = CredentialStore::from_content("[no-mfa]\naws_access_key_id = AKIA\n");
        let flow = Flow::new(&store);

        let (state, effect) = start(&flow);
        assert_eq!(state.step, Step::Done);
        assert!(matches!(effect, Effect::Render(Outcome::Failure(_))));
    }

    #[test]
    fn test_preselected_profile_and_driver_skip_prompts() {
        let store = CredentialStore::from_content(MANY);
        let flow = Flow::new(&store)
            .with_profile(Some("dev".to_string()))
            .with_driver(Some(DriverKind::Manual));

        let (state, effect) = start(&flow);
        // dev may assume both other roles
        assert_eq!(state.step, Step::RoleSelection);
        assert_eq!(state.driver, Some(AuthDriver::Manual(ManualDriver::new())));
        let Effect::SelectRole(choices) = effect else {
            panic!("expected role prompt, got {effect:?}");
        };
        assert_eq!(choices.len(), 3);
    }

    #[test]
    fn test_role_choices_start_with_self() {
        let store = CredentialStore::from_content(MANY);
        let flow = Flow::new(&store).with_driver(Some(DriverKind::Manual));

        let (state, _) = start(&flow);
        let (state, effect) = flow.transition(state, Event::ProfileSelected("prd".to_string()));
        assert_eq!(state.step, Step::RoleSelection);

        let Effect::SelectRole(choices) = effect else {
            panic!("expected role prompt, got {effect:?}");
        };
        assert_eq!(
            choices,
            vec![
                RoleChoice {
                    title: "prd".to_string(),
                    description: "Continue as the current user: [prd]".to_string(),
                    role: None,
                },
                RoleChoice {
                    title: "int".to_string(),
                    description: "Assume: [role/int-role]".to_string(),
                    role: Some(ROLE_INT.to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_no_assumable_roles_skips_to_mfa() {
        let store = CredentialStore::from_content(SINGLE);
        let flow = Flow::new(&store);

        let (state, _) = start(&flow);
        let (state, effect) = flow.transition(state, Event::DriverSelected(DriverKind::Manual));
        assert_eq!(state.step, Step::MfaInput);
        assert_eq!(effect, Effect::PromptCode { notice: None });
    }

    #[test]
    fn test_invalid_code_stays_in_mfa_input() {
        let store = CredentialStore::from_content(SINGLE);
        let flow = Flow::new(&store).with_driver(Some(DriverKind::Manual));

        let (state, _) = start(&flow);
        let (state, effect) = flow.transition(state, Event::CodeEntered("12a456".to_string()));
        assert_eq!(state.step, Step::MfaInput);
        assert_eq!(state.mfa_code, None);
        assert_eq!(
            effect,
            Effect::PromptCode {
                notice: Some(INVALID_CODE_NOTICE.to_string())
            }
        );

        let (state, effect) = flow.transition(state, Event::CodeEntered("123456".to_string()));
        assert_eq!(state.step, Step::Processing);
        assert_eq!(state.notice, None);
        assert_eq!(
            effect,
            Effect::Process(ProcessRequest {
                profile: "default".to_string(),
                role: None,
                mfa_code: "123456".to_string(),
            })
        );
    }

    #[test]
    fn test_selected_role_reaches_processing() {
        let store = CredentialStore::from_content(MANY);
        let flow = Flow::new(&store)
            .with_profile(Some("prd".to_string()))
            .with_driver(Some(DriverKind::Manual));

        let (state, _) = start(&flow);
        let (state, _) = flow.transition(state, Event::RoleSelected(Some(ROLE_INT.to_string())));
        let (_, effect) = flow.transition(state, Event::CodeEntered("654321".to_string()));
        assert_eq!(
            effect,
            Effect::Process(ProcessRequest {
                profile: "prd".to_string(),
                role: Some(ROLE_INT.to_string()),
                mfa_code: "654321".to_string(),
            })
        );
    }

    #[test]
    fn test_empty_role_means_no_assumption() {
        let store = CredentialStore::from_content(MANY);
        let flow = Flow::new(&store)
            .with_profile(Some("prd".to_string()))
            .with_driver(Some(DriverKind::Manual));

        let (state, _) = start(&flow);
        let (state, _) = flow.transition(state, Event::RoleSelected(Some(String::new())));
        assert_eq!(state.role, None);
        assert_eq!(state.step, Step::MfaInput);
    }

    #[test]
    fn test_vault_driver_fetches_code() {
        let store = CredentialStore::from_content(MANY);
        let flow = Flow::new(&store)
            .with_profile(Some("prd".to_string()))
            .with_driver(Some(DriverKind::Vault));

        let (state, _) = start(&flow);
        let (state, effect) = flow.transition(state, Event::RoleSelected(None));
        assert_eq!(
            effect,
            Effect::FetchCode(AuthDriver::Vault(VaultDriver::new(
                "op",
                "prd",
                Some("AWS prd")
            )))
        );

        let (state, effect) = flow.transition(state, Event::CodeFetched(Ok("111111".to_string())));
        assert_eq!(state.step, Step::Processing);
        assert!(matches!(effect, Effect::Process(_)));
    }

    #[test]
    fn test_driver_failure_is_terminal() {
        let store = CredentialStore::from_content(SINGLE);
        let flow = Flow::new(&store).with_driver(Some(DriverKind::Vault));

        let (state, _) = start(&flow);
        let (state, effect) = flow.transition(
            state,
            Event::CodeFetched(Err(LoginError::Driver("empty MFA code from 1Password".into()))),
        );
        assert_eq!(state.step, Step::Done);
        assert_eq!(
            effect,
            Effect::Render(Outcome::Failure("empty MFA code from 1Password".to_string()))
        );
    }

    #[test]
    fn test_processed_rebinds_profile() {
        let store = CredentialStore::from_content(MANY);
        let flow = Flow::new(&store)
            .with_profile(Some("prd".to_string()))
            .with_driver(Some(DriverKind::Manual));

        let (state, _) = start(&flow);
        let (state, _) = flow.transition(state, Event::RoleSelected(Some(ROLE_INT.to_string())));
        let (state, _) = flow.transition(state, Event::CodeEntered("654321".to_string()));

        let result = AuthFlowResult {
            profile: "int".to_string(),
            registry_login: false,
        };
        let (state, effect) = flow.transition(state, Event::Processed(Ok(result.clone())));
        assert_eq!(state.step, Step::Done);
        assert_eq!(state.profile.as_deref(), Some("int"));
        assert_eq!(effect, Effect::Render(Outcome::Success(result)));

        let (state, effect) = flow.transition(state, Event::Quit);
        assert_eq!(state.step, Step::Quit);
        assert_eq!(effect, Effect::Exit);
    }

    #[test]
    fn test_processing_error_message_preserved() {
        let store = CredentialStore::from_content(SINGLE);
        let flow = Flow::new(&store).with_driver(Some(DriverKind::Manual));

        let (state, _) = start(&flow);
        let (state, _) = flow.transition(state, Event::CodeEntered("123456".to_string()));
        let (state, _) = flow.transition(
            state,
            Event::Processed(Err(LoginError::Exchange("failed to get AWS session token: denied".into()))),
        );
        assert_eq!(
            state.outcome,
            Some(Outcome::Failure(
                "failed to get AWS session token: denied".to_string()
            ))
        );
    }

    #[test]
    fn test_cancel_from_any_step_quits() {
        let store = CredentialStore::from_content(MANY);
        let flow = Flow::new(&store);

        let (state, _) = start(&flow);
        let (state, effect) = flow.transition(state, Event::Quit);
        assert_eq!(state.step, Step::Quit);
        assert_eq!(state.outcome, None);
        assert_eq!(effect, Effect::Exit);

        // nothing happens after Quit
        let (state, effect) = flow.transition(state, Event::ProfileSelected("prd".to_string()));
        assert_eq!(state.step, Step::Quit);
        assert_eq!(effect, Effect::Exit);
    }

    #[test]
    fn test_outcome_survives_quit() {
        let store = CredentialStore::from_content(SINGLE);
        let flow = Flow::new(&store).with_driver(Some(DriverKind::Vault));

        let (state, _) = start(&flow);
        let (state, _) = flow.transition(state, Event::CodeFetched(Err(LoginError::Driver("boom".into()))));
        let (state, _) = flow.transition(state, Event::Quit);
        assert_eq!(state.step, Step::Quit);
        assert_eq!(state.outcome, Some(Outcome::Failure("boom".to_string())));
    }

    #[test]
    fn test_unexpected_event_is_ignored() {
        let store = CredentialStore::from_content(MANY);
        let flow = Flow::new(&store);

        let (state, _) = start(&flow);
        let before = state.clone();
        let (state, effect) = flow.transition(state, Event::CodeEntered("123456".to_string()));
        assert_eq!(state, before);
        assert_eq!(effect, Effect::Ignore);
    }
}

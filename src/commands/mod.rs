pub mod completions;
pub mod configure;
pub mod login;
pub mod profiles;

pub use completions::CompletionsCommand;
pub use configure::ConfigureCommand;
pub use login::LoginCommand;
pub use profiles::ProfilesCommand;

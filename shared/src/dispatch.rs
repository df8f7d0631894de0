//! Routes inbound chat text to the registration and meeting services.

use tracing::{info, warn};

use crate::meetings::MeetingLookupService;
use crate::registration::RegistrationResolver;
use crate::replies;

const MEETING_NOTICE: &str = "會議通知";
const BIND_REQUEST: &str = "我要綁定";
const REGISTRATION_PREFIXES: [&str; 2] = ["員編：", "員編:"];

/// A recognized chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    MeetingNotice,
    BindInstructions,
    Register(String),
    /// Registration prefix with nothing after it. The invalid-format reply
    /// is the binding instructions text.
    InvalidRegistration,
    Unrecognized,
}

impl Command {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text == MEETING_NOTICE {
            return Command::MeetingNotice;
        }
        if text == BIND_REQUEST {
            return Command::BindInstructions;
        }

        match REGISTRATION_PREFIXES
            .iter()
            .find_map(|prefix| text.strip_prefix(prefix))
        {
            Some(code) if code.trim().is_empty() => Command::InvalidRegistration,
            Some(code) => Command::Register(code.trim().to_string()),
            None => Command::Unrecognized,
        }
    }
}

/// Produces exactly one reply text per inbound message.
pub struct Dispatcher {
    registration: RegistrationResolver,
    meetings: MeetingLookupService,
}

impl Dispatcher {
    pub fn new(registration: RegistrationResolver, meetings: MeetingLookupService) -> Self {
        Self {
            registration,
            meetings,
        }
    }

    pub async fn respond(&self, user_id: &str, text: &str) -> String {
        let command = Command::parse(text);
        info!(user_id, command = ?command, "Dispatching message");

        match command {
            Command::MeetingNotice => match self.meetings.daily_report(user_id).await {
                Ok(report) => report,
                Err(e) => {
                    warn!(user_id, error = %e, "Meeting notice failed");
                    e.reply_text().to_string()
                }
            },
            Command::Register(code) => self
                .registration
                .register(&code, user_id)
                .await
                .reply_text(),
            Command::BindInstructions | Command::InvalidRegistration => {
                replies::BIND_INSTRUCTIONS.to_string()
            }
            Command::Unrecognized => replies::UNRECOGNIZED.to_string(),
        }
    }
}

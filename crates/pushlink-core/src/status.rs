// ── Registration status ──
//
// The externally visible (state, substate) pair. Modelled as one enum so
// an ERROR substate can only ever appear with the ERROR state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse registration state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    Invalid,
    Registering,
    Registered,
    Unregistering,
    Unregistered,
    Error,
}

/// How far a registration cycle has progressed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Progress {
    None,
    PromptingUser,
    InvalidatedAuthToken,
    HaveAuthToken,
    HaveAuthCookie,
    HaveRegId,
}

/// Why the engine landed in the ERROR state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCause {
    AuthToken,
    AuthCookie,
    C2dmNotFound,
    Register,
    Unregister,
    /// Error code reported verbatim by the push transport.
    Provider(String),
}

impl ErrorCause {
    pub fn as_str(&self) -> &str {
        match self {
            Self::AuthToken => "ERROR_AUTH_TOKEN",
            Self::AuthCookie => "ERROR_AUTH_COOKIE",
            Self::C2dmNotFound => "ERROR_C2DM_NOT_FOUND",
            Self::Register => "ERROR_REGISTER",
            Self::Unregister => "ERROR_UNREGISTER",
            Self::Provider(code) => code,
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "ERROR_AUTH_TOKEN" => Self::AuthToken,
            "ERROR_AUTH_COOKIE" => Self::AuthCookie,
            "ERROR_C2DM_NOT_FOUND" => Self::C2dmNotFound,
            "ERROR_REGISTER" => Self::Register,
            "ERROR_UNREGISTER" => Self::Unregister,
            other => Self::Provider(other.to_owned()),
        }
    }
}

/// Full registration status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum RegistrationStatus {
    #[default]
    Invalid,
    Registering(Progress),
    Registered,
    Unregistering,
    Unregistered,
    Error(ErrorCause),
}

impl RegistrationStatus {
    pub fn state(&self) -> State {
        match self {
            Self::Invalid => State::Invalid,
            Self::Registering(_) => State::Registering,
            Self::Registered => State::Registered,
            Self::Unregistering => State::Unregistering,
            Self::Unregistered => State::Unregistered,
            Self::Error(_) => State::Error,
        }
    }

    pub fn substate(&self) -> &str {
        match self {
            Self::Registering(progress) => progress.into(),
            Self::Error(cause) => cause.as_str(),
            _ => "NONE",
        }
    }

    /// Rebuild a status from its persisted string forms.
    ///
    /// Returns `None` for pairs that cannot occur.
    pub fn from_parts(state: &str, substate: &str) -> Option<Self> {
        let state: State = state.parse().ok()?;
        let status = match state {
            State::Invalid => Self::Invalid,
            State::Registering => Self::Registering(substate.parse().ok()?),
            State::Registered => Self::Registered,
            State::Unregistering => Self::Unregistering,
            State::Unregistered => Self::Unregistered,
            State::Error => {
                if substate.is_empty() || substate == "NONE" {
                    return None;
                }
                Self::Error(ErrorCause::parse(substate))
            }
        };
        if !matches!(status, Self::Registering(_) | Self::Error(_)) && substate != "NONE" {
            return None;
        }
        Some(status)
    }

    /// Resting states survive a restart; in-flight ones do not.
    pub fn is_resting(&self) -> bool {
        matches!(self, Self::Registered | Self::Unregistered | Self::Error(_))
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered)
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.state(), self.substate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_forms() {
        let s = RegistrationStatus::Registering(Progress::InvalidatedAuthToken);
        assert_eq!(s.state().to_string(), "REGISTERING");
        assert_eq!(s.substate(), "INVALIDATED_AUTH_TOKEN");
        assert_eq!(
            RegistrationStatus::Error(ErrorCause::C2dmNotFound).to_string(),
            "ERROR/ERROR_C2DM_NOT_FOUND"
        );
        assert_eq!(RegistrationStatus::Unregistered.to_string(), "UNREGISTERED/NONE");
    }

    #[test]
    fn provider_codes_pass_through() {
        let s = RegistrationStatus::Error(ErrorCause::Provider("SERVICE_NOT_AVAILABLE".into()));
        assert_eq!(s.substate(), "SERVICE_NOT_AVAILABLE");
        assert_eq!(
            RegistrationStatus::from_parts("ERROR", "SERVICE_NOT_AVAILABLE"),
            Some(s)
        );
    }

    #[test]
    fn from_parts_round_trips_every_variant() {
        let all = [
            RegistrationStatus::Invalid,
            RegistrationStatus::Registering(Progress::None),
            RegistrationStatus::Registering(Progress::PromptingUser),
            RegistrationStatus::Registering(Progress::HaveRegId),
            RegistrationStatus::Registered,
            RegistrationStatus::Unregistering,
            RegistrationStatus::Unregistered,
            RegistrationStatus::Error(ErrorCause::AuthToken),
            RegistrationStatus::Error(ErrorCause::AuthCookie),
            RegistrationStatus::Error(ErrorCause::Register),
            RegistrationStatus::Error(ErrorCause::Unregister),
        ];
        for status in all {
            let state = status.state().to_string();
            assert_eq!(
                RegistrationStatus::from_parts(&state, status.substate()),
                Some(status.clone()),
                "{status}"
            );
        }
    }

    #[test]
    fn from_parts_rejects_impossible_pairs() {
        assert_eq!(RegistrationStatus::from_parts("REGISTERED", "ERROR_REGISTER"), None);
        assert_eq!(RegistrationStatus::from_parts("REGISTERING", "ERROR_AUTH_TOKEN"), None);
        assert_eq!(RegistrationStatus::from_parts("ERROR", "NONE"), None);
        assert_eq!(RegistrationStatus::from_parts("BOGUS", "NONE"), None);
    }

    #[test]
    fn resting_states() {
        assert!(RegistrationStatus::Registered.is_resting());
        assert!(RegistrationStatus::Error(ErrorCause::Register).is_resting());
        assert!(!RegistrationStatus::Unregistering.is_resting());
        assert!(!RegistrationStatus::Registering(Progress::HaveAuthCookie).is_resting());
    }
}

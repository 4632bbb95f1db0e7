/// How assistant replies are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Demo mode: a canned reply typed out locally
    #[default]
    Simulated,
    /// Wired mode: each message is posted to the chat backend
    Remote,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Simulated => "simulated",
            DeliveryMode::Remote => "remote",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "simulated" | "demo" => Some(DeliveryMode::Simulated),
            "remote" | "backend" => Some(DeliveryMode::Remote),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DeliveryMode::Simulated => "Demo (simulated)",
            DeliveryMode::Remote => "Backend",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!(DeliveryMode::from_str("Remote"), Some(DeliveryMode::Remote));
        assert_eq!(DeliveryMode::from_str(" demo "), Some(DeliveryMode::Simulated));
        assert_eq!(DeliveryMode::from_str("carrier-pigeon"), None);
    }

    #[test]
    fn round_trips_through_as_str() {
        for mode in [DeliveryMode::Simulated, DeliveryMode::Remote] {
            assert_eq!(DeliveryMode::from_str(mode.as_str()), Some(mode));
        }
    }
}

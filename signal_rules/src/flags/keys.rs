//! Flag key naming conventions shared by every writer of the store.

pub const EVENT_PREFIX: &str = "event_";
pub const VARIABLE_PREFIX: &str = "var_";
pub const DISCOVERED_PREFIX: &str = "discovered_";

/// `event_<id>`: set once per history entry.
pub fn event_flag(event_id: &str) -> String {
    format!("{}{}", EVENT_PREFIX, event_id)
}

/// `choice_<eventId>_<index>`
pub fn choice_flag(event_id: &str, index: usize) -> String {
    format!("choice_{}_{}", event_id, index)
}

/// `var_<name>`: marker that a variable has been written.
pub fn variable_flag(name: &str) -> String {
    format!("{}{}", VARIABLE_PREFIX, name)
}

/// `var_<name>_value`
pub fn variable_value_key(name: &str) -> String {
    format!("{}{}_value", VARIABLE_PREFIX, name)
}

/// `discovered_<payloadId>`
pub fn discovered_flag(payload_id: &str) -> String {
    format!("{}{}", DISCOVERED_PREFIX, payload_id)
}

/// Extract the event id from an `event_<id>` flag name.
pub fn parse_event_flag(flag: &str) -> Option<&str> {
    flag.strip_prefix(EVENT_PREFIX).filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        assert_eq!(event_flag("intro"), "event_intro");
        assert_eq!(choice_flag("intro", 2), "choice_intro_2");
        assert_eq!(variable_flag("trust"), "var_trust");
        assert_eq!(variable_value_key("trust"), "var_trust_value");
        assert_eq!(discovered_flag("numbers_station"), "discovered_numbers_station");
    }

    #[test]
    fn test_parse_event_flag() {
        assert_eq!(parse_event_flag("event_intro"), Some("intro"));
        assert_eq!(parse_event_flag("event_"), None);
        assert_eq!(parse_event_flag("choice_intro_0"), None);
    }
}

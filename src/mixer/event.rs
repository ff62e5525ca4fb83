//! Activator notification lines (`ACTS OK ...`)

use std::fmt;

/// Input key used when a notification carries no input
pub const NO_INPUT: &str = "none";

/// One parsed `ACTS OK <trigger> [<input>] <value>` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActsEvent {
    pub trigger: String,
    pub input: Option<String>,
    pub value: String,
}

impl ActsEvent {
    pub fn new(trigger: impl Into<String>, input: Option<u32>, on: bool) -> Self {
        Self {
            trigger: trigger.into(),
            input: input.map(|i| i.to_string()),
            value: if on { "1" } else { "0" }.to_string(),
        }
    }

    /// Parse a line from the subscription feed
    ///
    /// Returns `None` for anything that is not a 4 or 5 field `ACTS OK` line.
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 || fields[0] != "ACTS" || fields[1] != "OK" {
            return None;
        }

        match fields.len() {
            4 => Some(Self {
                trigger: fields[2].to_string(),
                input: None,
                value: fields[3].to_string(),
            }),
            5 => Some(Self {
                trigger: fields[2].to_string(),
                input: Some(fields[3].to_string()),
                value: fields[4].to_string(),
            }),
            _ => None,
        }
    }

    /// Activator table key for this event
    pub fn input_key(&self) -> &str {
        self.input.as_deref().unwrap_or(NO_INPUT)
    }

    /// Numeric input id, 0 when absent or malformed
    pub fn input_id(&self) -> u32 {
        self.input
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    pub fn is_on(&self) -> bool {
        self.value == "1"
    }
}

impl fmt::Display for ActsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.input {
            Some(input) => write!(f, "ACTS OK {} {} {}", self.trigger, input, self.value),
            None => write!(f, "ACTS OK {} {}", self.trigger, self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_input() {
        let event = ActsEvent::parse("ACTS OK InputPlaying 3 1\r\n").unwrap();
        assert_eq!(event.trigger, "InputPlaying");
        assert_eq!(event.input.as_deref(), Some("3"));
        assert_eq!(event.input_id(), 3);
        assert!(event.is_on());
    }

    #[test]
    fn test_parse_without_input() {
        let event = ActsEvent::parse("ACTS OK Streaming 0").unwrap();
        assert_eq!(event.input_key(), NO_INPUT);
        assert_eq!(event.input_id(), 0);
        assert!(!event.is_on());
    }

    #[test]
    fn test_rejects_malformed_lines() {
        assert_eq!(ActsEvent::parse(""), None);
        assert_eq!(ActsEvent::parse("ACTS OK Input"), None);
        assert_eq!(ActsEvent::parse("ACTS ER Input 1 1"), None);
        assert_eq!(ActsEvent::parse("XML 1234"), None);
        assert_eq!(ActsEvent::parse("ACTS OK A B C D"), None);
    }

    #[test]
    fn test_display_matches_wire_format() {
        assert_eq!(
            ActsEvent::new("InputBusBAudio", Some(4), true).to_string(),
            "ACTS OK InputBusBAudio 4 1"
        );
        assert_eq!(
            ActsEvent::new("Recording", None, false).to_string(),
            "ACTS OK Recording 0"
        );
    }
}

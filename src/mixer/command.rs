//! Outgoing mixer commands

use std::fmt;

/// Command line sent to the mixer (without the CRLF terminator)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixerCommand {
    /// `FUNCTION <name> k=v&k=v`, values form-urlencoded
    Function {
        name: String,
        params: Vec<(String, String)>,
    },

    /// Line sent verbatim
    Raw(String),
}

impl MixerCommand {
    pub fn function(name: impl Into<String>) -> Self {
        MixerCommand::Function {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Append a query parameter (no-op on raw lines)
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let MixerCommand::Function { params, .. } = &mut self {
            params.push((key.into(), value.into()));
        }
        self
    }

    pub fn raw(line: impl Into<String>) -> Self {
        MixerCommand::Raw(line.into())
    }

    pub fn subscribe_acts() -> Self {
        Self::raw("SUBSCRIBE ACTS")
    }

    pub fn xml() -> Self {
        Self::raw("XML")
    }

    /// `FUNCTION <text>` where the text already carries its own query
    ///
    /// A leading `FUNCTION ` in `text` is not repeated.
    pub fn user_function(text: &str) -> Self {
        let text = text.trim();
        let body = text.strip_prefix("FUNCTION ").unwrap_or(text);
        Self::raw(format!("FUNCTION {}", body))
    }

    pub fn set_text(input: &str, text_box: &str, value: &str) -> Self {
        Self::function("SetText")
            .param("Input", input)
            .param("SelectedName", text_box)
            .param("Value", value)
    }

    pub fn overlay_in(slot: u8, input: &str) -> Self {
        Self::function(format!("OverlayInput{}In", slot)).param("Input", input)
    }

    /// Overlay out, optionally restricted to one input
    pub fn overlay_out(slot: u8, input: Option<&str>) -> Self {
        let cmd = Self::function(format!("OverlayInput{}Out", slot));
        match input {
            Some(input) => cmd.param("Input", input),
            None => cmd,
        }
    }

    /// Route an input to the master bus
    pub fn audio_bus_on(input: &str) -> Self {
        Self::function("AudioBusOn")
            .param("Value", "M")
            .param("Input", input)
    }

    pub fn audio_bus_off(input: &str) -> Self {
        Self::function("AudioBusOff")
            .param("Value", "M")
            .param("Input", input)
    }

    pub fn script_start(script: &str) -> Self {
        Self::function("ScriptStart").param("Value", script)
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

impl fmt::Display for MixerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MixerCommand::Raw(line) => f.write_str(line),
            MixerCommand::Function { name, params } => {
                write!(f, "FUNCTION {}", name)?;
                for (i, (key, value)) in params.iter().enumerate() {
                    let sep = if i == 0 { ' ' } else { '&' };
                    write!(f, "{}{}={}", sep, key, encode(value))?;
                }
                Ok(())
            }
        }
    }
}

//! Single-key commands.
//!
//! These keys, together with direct interaction, are the only triggers into
//! a [`Session`](crate::session::Session). The `session` subcommand replays
//! them from a key script.

/// An operator command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Capture,
    Reset,
    Export,
    ToggleCoordinateList,
    NextCoordinate,
    PreviousCoordinate,
}

impl Command {
    pub const ALL: [Command; 6] = [
        Command::Capture,
        Command::Reset,
        Command::Export,
        Command::ToggleCoordinateList,
        Command::NextCoordinate,
        Command::PreviousCoordinate,
    ];

    /// Map a pressed key to its command. Keys are case-sensitive.
    pub fn from_key(key: char) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.key() == key)
    }

    pub fn key(&self) -> char {
        match self {
            Command::Capture => 'c',
            Command::Reset => 'r',
            Command::Export => 'd',
            Command::ToggleCoordinateList => 'l',
            Command::NextCoordinate => 'n',
            Command::PreviousCoordinate => 'p',
        }
    }
}

/// The commands bound to each key of `script`, in order.
///
/// Whitespace and unbound keys are skipped.
pub fn parse_key_script(script: &str) -> Vec<Command> {
    script
        .chars()
        .filter(|key| !key.is_whitespace())
        .filter_map(|key| {
            let command = Command::from_key(key);
            if command.is_none() {
                tracing::debug!(%key, "unbound key ignored");
            }
            command
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        for command in Command::ALL {
            assert_eq!(Command::from_key(command.key()), Some(command));
        }
    }

    #[test]
    fn unbound_keys_map_to_nothing() {
        assert_eq!(Command::from_key('x'), None);
        assert_eq!(Command::from_key('C'), None);
    }

    #[test]
    fn key_script_skips_whitespace_and_unbound_keys() {
        assert_eq!(
            parse_key_script("c x\nd R r"),
            vec![Command::Capture, Command::Export, Command::Reset]
        );
        assert!(parse_key_script("").is_empty());
    }
}

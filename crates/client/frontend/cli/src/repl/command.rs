//! Console command grammar.
use battle_core::{Address, MatchId};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    /// Join the queue for the configured mode.
    Queue,
    /// Leave the queue.
    Leave,
    Challenge(Address),
    Accept(MatchId),
    Reject(MatchId),
    /// List challenges involving us.
    List,
    Status,
    Moves,
    /// Answer to a move prompt (1-based index into the move list).
    Pick(usize),
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command `{0}`, type `help`")]
    Unknown(String),

    #[error("`{command}` needs {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[error("`{0}` is not a valid address")]
    InvalidAddress(String),

    #[error("`{0}` is not a valid challenge id")]
    InvalidId(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();

        if let Ok(index) = head.parse::<usize>() {
            return Ok(Some(ReplCommand::Pick(index)));
        }

        let command = match head.to_lowercase().as_str() {
            "help" | "?" => ReplCommand::Help,
            "queue" | "q" => ReplCommand::Queue,
            "leave" => ReplCommand::Leave,
            "challenge" => {
                let raw = arg.ok_or(CommandError::MissingArgument {
                    command: "challenge",
                    expected: "an opponent address",
                })?;
                let opponent = raw
                    .parse::<Address>()
                    .map_err(|_| CommandError::InvalidAddress(raw.to_string()))?;
                ReplCommand::Challenge(opponent)
            }
            "accept" => ReplCommand::Accept(parse_id("accept", arg)?),
            "reject" => ReplCommand::Reject(parse_id("reject", arg)?),
            "list" | "ls" => ReplCommand::List,
            "status" | "s" => ReplCommand::Status,
            "moves" => ReplCommand::Moves,
            "quit" | "exit" => ReplCommand::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn parse_id(command: &'static str, arg: Option<&str>) -> Result<MatchId, CommandError> {
    let raw = arg.ok_or(CommandError::MissingArgument {
        command,
        expected: "a challenge id",
    })?;
    raw.trim_start_matches('#')
        .parse::<u64>()
        .map(MatchId)
        .map_err(|_| CommandError::InvalidId(raw.to_string()))
}

pub const HELP: &str = "\
Commands:
  queue                 join the queue for the configured mode
  leave                 leave the queue
  challenge <address>   challenge a participant
  accept <id>           accept a challenge and start playing
  reject <id>           reject or cancel a challenge
  list                  list challenges involving you
  status                show the current match
  moves                 list the available moves
  <number>              answer a move prompt
  quit                  exit";

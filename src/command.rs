//! # Quillpad commands
//!
//! Clients speak a line protocol of `kind|arg` frames. Payload-bearing
//! commands (create, update) carry their fields as a JSON object in the
//! argument so titles and content can contain the separator freely.
use displaydoc::Display;
use std::str::FromStr;

/// Error when parsing a command
#[derive(Debug, Display)]
pub enum ParseCommandError {
    /// The command expected an argument (e.g. `{0}|foo`)
    MissingArg(CommandKind),
    /// The command `{0}` is not known
    UnknownCommand(String),
}

/// A kind of incoming command
#[derive(Debug, Display)]
pub enum CommandKind {
    /// init
    Init,
    /// create
    Create,
    /// update
    Update,
    /// delete
    Delete,
    /// share
    Share,
    /// fetch
    Fetch,
    /// list
    List,
    /// render
    Render,
}

/// An incoming command
#[derive(Debug, Clone)]
pub enum Command {
    /// Start a session with a bearer token
    Init(String),
    /// Create a note from a JSON payload
    Create(String),
    /// Update a note from a JSON payload
    Update(String),
    /// Delete a note by id
    Delete(String),
    /// Toggle sharing of a note; the flag is passed through verbatim
    Share(String, String),
    /// Fetch a note by id
    Fetch(String),
    /// List the notes of the current user
    List,
    /// Render a note by id
    Render(String),
    /// Close the connection
    Close,
}

impl FromStr for CommandKind {
    type Err = ParseCommandError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(Self::Init),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "share" => Ok(Self::Share),
            "fetch" => Ok(Self::Fetch),
            "list" => Ok(Self::List),
            "render" => Ok(Self::Render),
            _ => Err(ParseCommandError::UnknownCommand(s.to_owned())),
        }
    }
}

fn split_arg(input: &str) -> (&str, Option<&str>) {
    if let Some(cmd_len) = input.find('|') {
        let (cmd, r) = input.split_at(cmd_len);
        let (_, arg) = r.split_at(1);
        (cmd, Some(arg))
    } else {
        (input, None)
    }
}

impl FromStr for Command {
    type Err = ParseCommandError;
    fn from_str(input: &str) -> Result<Command, ParseCommandError> {
        let (cmd, arg) = split_arg(input);

        let kind: CommandKind = cmd.parse()?;
        let required = |kind: CommandKind| arg.ok_or(ParseCommandError::MissingArg(kind));
        match kind {
            CommandKind::Init => Ok(Command::Init(required(CommandKind::Init)?.to_owned())),
            CommandKind::Create => Ok(Command::Create(required(CommandKind::Create)?.to_owned())),
            CommandKind::Update => Ok(Command::Update(required(CommandKind::Update)?.to_owned())),
            CommandKind::Delete => Ok(Command::Delete(required(CommandKind::Delete)?.to_owned())),
            CommandKind::Fetch => Ok(Command::Fetch(required(CommandKind::Fetch)?.to_owned())),
            CommandKind::Render => Ok(Command::Render(required(CommandKind::Render)?.to_owned())),
            CommandKind::List => Ok(Command::List),
            CommandKind::Share => {
                let text = required(CommandKind::Share)?;
                let (note_id, opt_flag) = split_arg(text);
                let flag = opt_flag.ok_or(ParseCommandError::MissingArg(CommandKind::Share))?;
                Ok(Command::Share(note_id.to_owned(), flag.to_owned()))
            }
        }
    }
}

//! External command tuples.
//!
//! Hosts queue commands such as `["on", "event", handler]` or
//! `["off", "event"]` before the coordinator exists. [`RawCommand`] keeps
//! that loose tuple shape; [`Command`] is the typed form produced once at
//! the boundary by [`Command::try_from`].

use crate::callback::{CallbackKind, Descriptor, DescriptorError, Handler};
use thiserror::Error;

/// One element of a raw command tuple.
#[derive(Debug)]
pub enum CommandArg {
    Text(String),
    Handler(Handler),
}

impl From<&str> for CommandArg {
    fn from(s: &str) -> Self {
        CommandArg::Text(s.to_string())
    }
}

impl From<String> for CommandArg {
    fn from(s: String) -> Self {
        CommandArg::Text(s)
    }
}

impl From<Handler> for CommandArg {
    fn from(h: Handler) -> Self {
        CommandArg::Handler(h)
    }
}

/// An unparsed command tuple.
#[derive(Debug, Default)]
pub struct RawCommand(pub Vec<CommandArg>);

impl RawCommand {
    pub fn new(args: Vec<CommandArg>) -> Self {
        Self(args)
    }

    /// `["on", descriptor, handler]`
    pub fn on(descriptor: &str, handler: Handler) -> Self {
        Self(vec![
            CommandArg::from("on"),
            CommandArg::from(descriptor),
            CommandArg::Handler(handler),
        ])
    }

    /// `["off", descriptor]`
    pub fn off(descriptor: &str) -> Self {
        Self(vec![CommandArg::from("off"), CommandArg::from(descriptor)])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A command tuple that could not be interpreted.
#[derive(Debug, Error)]
pub enum MalformedCommand {
    #[error("command has {0} elements, expected at least {1}")]
    Arity(usize, usize),

    #[error("element {0} must be a string")]
    ExpectedText(usize),

    #[error("element {0} must be a handler")]
    ExpectedHandler(usize),

    #[error("unknown command verb: {0}")]
    UnknownVerb(String),

    #[error("invalid descriptor: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("descriptor targets {descriptor} callbacks but handler is a {handler} handler")]
    HandlerMismatch {
        descriptor: CallbackKind,
        handler: CallbackKind,
    },
}

/// A validated command.
#[derive(Debug)]
pub enum Command {
    Subscribe {
        descriptor: Descriptor,
        handler: Handler,
    },
    Unsubscribe {
        descriptor: Descriptor,
    },
}

fn take_text(args: &mut std::vec::IntoIter<CommandArg>, position: usize) -> Result<String, MalformedCommand> {
    match args.next() {
        Some(CommandArg::Text(s)) => Ok(s),
        _ => Err(MalformedCommand::ExpectedText(position)),
    }
}

impl TryFrom<RawCommand> for Command {
    type Error = MalformedCommand;

    fn try_from(raw: RawCommand) -> Result<Self, Self::Error> {
        let len = raw.len();
        if len < 2 {
            return Err(MalformedCommand::Arity(len, 2));
        }

        let mut args = raw.0.into_iter();
        let verb = take_text(&mut args, 0)?;
        match verb.as_str() {
            "on" => {
                if len < 3 {
                    return Err(MalformedCommand::Arity(len, 3));
                }
                let descriptor: Descriptor = take_text(&mut args, 1)?.parse()?;
                let Some(CommandArg::Handler(handler)) = args.next() else {
                    return Err(MalformedCommand::ExpectedHandler(2));
                };
                if handler.kind() != descriptor.kind {
                    return Err(MalformedCommand::HandlerMismatch {
                        descriptor: descriptor.kind,
                        handler: handler.kind(),
                    });
                }
                Ok(Command::Subscribe {
                    descriptor,
                    handler,
                })
            }
            "off" => {
                let descriptor: Descriptor = take_text(&mut args, 1)?.parse()?;
                Ok(Command::Unsubscribe { descriptor })
            }
            other => Err(MalformedCommand::UnknownVerb(other.to_string())),
        }
    }
}

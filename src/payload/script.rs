//! Keystroke script parser (DuckyScript subset).
//!
//! One command per line; the command word is case-insensitive:
//!
//! | Line                                   | Action                         |
//! |----------------------------------------|--------------------------------|
//! | empty, `REM ...`                       | nothing                        |
//! | `DELAY <ms>`                           | wait                           |
//! | `STRING <text>`                        | type text (US layout)          |
//! | `ENTER`                                | tap Enter                      |
//! | `GUI [key]`, `WINDOWS [key]`           | key with Left GUI, or GUI alone|
//! | `MENU`, `APP`                          | tap Application                |
//! | `SHIFT <key>`, `CTRL <key>`, `ALT <key>` | key with that modifier       |
//! | `<key name>` (`TAB`, `ESC`, `F5`, ...) | tap that key                   |
//!
//! Parsing borrows from the script text; nothing is allocated.

use crate::hid::keyboard::{MOD_LEFT_ALT, MOD_LEFT_CTRL, MOD_LEFT_GUI, MOD_LEFT_SHIFT};
use crate::hid::Key;
use crate::payload::keymap::key_by_name;

/// One executable step of a script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action<'a> {
    /// Wait this many milliseconds.
    Delay(u32),
    /// Type the text character by character.
    Type(&'a str),
    /// Press and release one chord.
    Tap(Key),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScriptErrorKind {
    UnknownCommand,
    UnknownKey,
    MissingArgument,
    BadDelay,
}

/// A line that could not be parsed. `line` is 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScriptError {
    pub line: u16,
    pub kind: ScriptErrorKind,
}

/// Parse a single line. `Ok(None)` for blank lines and comments.
pub fn parse_line(line: &str) -> Result<Option<Action<'_>>, ScriptErrorKind> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (cmd, args) = line.split_once(' ').unwrap_or((line, ""));
    let is = |name: &str| cmd.eq_ignore_ascii_case(name);

    let action = if is("REM") {
        return Ok(None);
    } else if is("DELAY") {
        let ms = args
            .trim()
            .parse()
            .map_err(|_| ScriptErrorKind::BadDelay)?;
        Action::Delay(ms)
    } else if is("STRING") {
        Action::Type(args)
    } else if is("GUI") || is("WINDOWS") {
        let key = if args.trim().is_empty() {
            Key::default()
        } else {
            named(args)?
        };
        Action::Tap(key.with_modifier(MOD_LEFT_GUI))
    } else if is("SHIFT") {
        Action::Tap(required(args)?.with_modifier(MOD_LEFT_SHIFT))
    } else if is("CTRL") || is("CONTROL") {
        Action::Tap(required(args)?.with_modifier(MOD_LEFT_CTRL))
    } else if is("ALT") {
        Action::Tap(required(args)?.with_modifier(MOD_LEFT_ALT))
    } else if args.is_empty() {
        // ENTER, MENU, APP, TAB, F5 ... all resolve through the key table.
        Action::Tap(key_by_name(cmd).ok_or(ScriptErrorKind::UnknownCommand)?)
    } else {
        return Err(ScriptErrorKind::UnknownCommand);
    };

    Ok(Some(action))
}

fn named(arg: &str) -> Result<Key, ScriptErrorKind> {
    key_by_name(arg.trim()).ok_or(ScriptErrorKind::UnknownKey)
}

fn required(arg: &str) -> Result<Key, ScriptErrorKind> {
    if arg.trim().is_empty() {
        return Err(ScriptErrorKind::MissingArgument);
    }
    named(arg)
}

/// Iterate over the actions of `script`, tagging errors with their line.
pub fn actions(script: &str) -> impl Iterator<Item = Result<Action<'_>, ScriptError>> {
    script.lines().enumerate().filter_map(|(i, line)| {
        parse_line(line)
            .map_err(|kind| ScriptError {
                line: u16::try_from(i + 1).unwrap_or(u16::MAX),
                kind,
            })
            .transpose()
    })
}

/// Check a whole script up front. Returns the number of actions.
pub fn validate(script: &str) -> Result<usize, ScriptError> {
    actions(script).try_fold(0, |n, action| action.map(|_| n + 1))
}

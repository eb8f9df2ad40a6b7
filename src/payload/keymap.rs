//! Text → keystroke mapping for a US keyboard layout.

use crate::hid::keyboard::*;

/// Key names accepted after `GUI`, `SHIFT`, etc. and as bare commands.
const NAMED_KEYS: &[(&str, u8)] = &[
    ("ENTER", KEY_ENTER),
    ("RETURN", KEY_ENTER),
    ("ESC", KEY_ESCAPE),
    ("ESCAPE", KEY_ESCAPE),
    ("BACKSPACE", KEY_BACKSPACE),
    ("TAB", KEY_TAB),
    ("SPACE", KEY_SPACE),
    ("CAPSLOCK", KEY_CAPS_LOCK),
    ("PRINTSCREEN", KEY_PRINT_SCREEN),
    ("INSERT", KEY_INSERT),
    ("HOME", KEY_HOME),
    ("PAGEUP", KEY_PAGE_UP),
    ("DELETE", KEY_DELETE),
    ("DEL", KEY_DELETE),
    ("END", KEY_END),
    ("PAGEDOWN", KEY_PAGE_DOWN),
    ("RIGHT", KEY_RIGHT),
    ("RIGHTARROW", KEY_RIGHT),
    ("LEFT", KEY_LEFT),
    ("LEFTARROW", KEY_LEFT),
    ("DOWN", KEY_DOWN),
    ("DOWNARROW", KEY_DOWN),
    ("UP", KEY_UP),
    ("UPARROW", KEY_UP),
    ("MENU", KEY_APPLICATION),
    ("APP", KEY_APPLICATION),
];

/// Keystroke that types `c`, or `None` if the layout can't produce it.
pub fn ascii_to_key(c: char) -> Option<Key> {
    let key = match c {
        'a'..='z' => Key::new(KEY_A + (c as u8 - b'a')),
        'A'..='Z' => Key::shifted(KEY_A + (c as u8 - b'A')),
        '1'..='9' => Key::new(KEY_1 + (c as u8 - b'1')),
        '0' => Key::new(KEY_0),
        '\n' => Key::new(KEY_ENTER),
        '\t' => Key::new(KEY_TAB),
        ' ' => Key::new(KEY_SPACE),
        '!' => Key::shifted(KEY_1),
        '@' => Key::shifted(KEY_1 + 1),
        '#' => Key::shifted(KEY_1 + 2),
        '$' => Key::shifted(KEY_1 + 3),
        '%' => Key::shifted(KEY_1 + 4),
        '^' => Key::shifted(KEY_1 + 5),
        '&' => Key::shifted(KEY_1 + 6),
        '*' => Key::shifted(KEY_1 + 7),
        '(' => Key::shifted(KEY_1 + 8),
        ')' => Key::shifted(KEY_0),
        _ => return punctuation(c),
    };
    Some(key)
}

fn punctuation(c: char) -> Option<Key> {
    // (unshifted, shifted, usage)
    const TABLE: &[(char, char, u8)] = &[
        ('-', '_', 0x2D),
        ('=', '+', 0x2E),
        ('[', '{', 0x2F),
        (']', '}', 0x30),
        ('\\', '|', 0x31),
        (';', ':', 0x33),
        ('\'', '"', 0x34),
        ('`', '~', 0x35),
        (',', '<', 0x36),
        ('.', '>', 0x37),
        ('/', '?', 0x38),
    ];

    TABLE.iter().find_map(|&(plain, shifted, usage)| {
        if c == plain {
            Some(Key::new(usage))
        } else if c == shifted {
            Some(Key::shifted(usage))
        } else {
            None
        }
    })
}

/// Look up a key by name (case-insensitive): `ENTER`, `TAB`, `F5`, `r`, ...
///
/// A single letter names the unshifted key, so `GUI R` and `GUI r` are the
/// same chord.
pub fn key_by_name(name: &str) -> Option<Key> {
    if let Some(&(_, usage)) = NAMED_KEYS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
    {
        return Some(Key::new(usage));
    }

    if let Some(key) = function_key(name) {
        return Some(key);
    }

    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => ascii_to_key(c.to_ascii_lowercase()),
        _ => None,
    }
}

fn function_key(name: &str) -> Option<Key> {
    let n: u8 = name
        .strip_prefix('F')
        .or_else(|| name.strip_prefix('f'))?
        .parse()
        .ok()?;
    (1..=12).contains(&n).then(|| Key::new(KEY_F1 + n - 1))
}

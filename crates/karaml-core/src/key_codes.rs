// Karaml Core - Reference Key Tables
// Key codes, consumer key codes and pointing buttons known to Karabiner-Elements

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::event::EventKind;

pub const KEY_CODES: &[&str] = &[
    "caps_lock", "return_or_enter", "escape", "delete_or_backspace", "delete_forward", "tab",
    "spacebar", "hyphen", "equal_sign", "open_bracket", "close_bracket", "backslash",
    "non_us_pound", "semicolon", "quote", "grave_accent_and_tilde", "comma", "period", "slash",
    "non_us_backslash", "up_arrow", "down_arrow", "left_arrow", "right_arrow", "page_up",
    "page_down", "home", "end", "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m",
    "n", "o", "p", "q", "r", "s", "t", "u", "v", "w", "x", "y", "z", "1", "2", "3", "4", "5",
    "6", "7", "8", "9", "0", "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11",
    "f12", "f13", "f14", "f15", "f16", "f17", "f18", "f19", "f20", "f21", "f22", "f23", "f24",
    "keypad_num_lock", "keypad_slash", "keypad_asterisk", "keypad_hyphen", "keypad_plus",
    "keypad_enter", "keypad_1", "keypad_2", "keypad_3", "keypad_4", "keypad_5", "keypad_6",
    "keypad_7", "keypad_8", "keypad_9", "keypad_0", "keypad_period", "keypad_equal_sign",
    "keypad_comma", "vk_none", "print_screen", "scroll_lock", "pause", "insert", "application",
    "help", "power", "execute", "menu", "select", "stop", "again", "undo", "cut", "copy",
    "paste", "find", "international1", "international2", "international3", "international4",
    "international5", "international6", "international7", "international8", "international9",
    "lang1", "lang2", "lang3", "lang4", "lang5", "lang6", "lang7", "lang8", "lang9",
    "japanese_eisuu", "japanese_kana", "japanese_pc_nfer", "japanese_pc_xfer",
    "japanese_pc_katakana", "left_control", "left_shift", "left_option", "left_command",
    "right_control", "right_shift", "right_option", "right_command", "fn",
    "keypad_equal_sign_as400", "locking_caps_lock", "locking_num_lock", "locking_scroll_lock",
    "alternate_erase", "sys_req_or_attention", "cancel", "clear", "prior", "return",
    "separator", "out", "oper", "clear_or_again", "cr_sel_or_props", "ex_sel", "left_alt",
    "left_gui", "right_alt", "right_gui", "vk_consumer_brightness_down",
    "vk_consumer_brightness_up", "vk_mission_control", "vk_launchpad", "vk_dashboard",
    "vk_consumer_illumination_down", "vk_consumer_illumination_up", "vk_consumer_previous",
    "vk_consumer_play", "vk_consumer_next", "volume_down", "volume_up",
    "display_brightness_decrement", "display_brightness_increment", "rewind", "play_or_pause",
    "fastforward", "mute", "volume_decrement", "volume_increment",
    "apple_display_brightness_decrement", "apple_display_brightness_increment", "dashboard",
    "launchpad", "mission_control", "apple_top_case_display_brightness_decrement",
    "apple_top_case_display_brightness_increment", "illumination_decrement",
    "illumination_increment",
];

pub const CONSUMER_KEY_CODES: &[&str] = &[
    "display_brightness_decrement", "display_brightness_increment", "dictation", "rewind",
    "play_or_pause", "fast_forward", "mute", "volume_decrement", "volume_increment", "menu",
    "al_terminal_lock_or_screensaver", "eject", "scan_previous_track", "scan_next_track",
    "fastforward",
];

pub const POINTING_BUTTONS: &[&str] = &[
    "button1", "button2", "button3", "button4", "button5", "button6", "button7", "button8",
    "button9", "button10", "button11", "button12", "button13", "button14", "button15",
    "button16", "button17", "button18", "button19", "button20", "button21", "button22",
    "button23", "button24", "button25", "button26", "button27", "button28", "button29",
    "button30", "button31", "button32",
];

/// Modifiers accepted by the `sticky_modifier` event
pub const STICKY_MODIFIERS: &[&str] = &[
    "left_control", "left_shift", "left_option", "left_command", "right_control",
    "right_shift", "right_option", "right_command", "fn",
];

/// Single-character modifier names used inside modifier blocks (`<cs-j>`)
pub const MODIFIER_CHARS: &[(char, &str)] = &[
    ('m', "left_command"),
    ('o', "left_option"),
    ('c', "left_control"),
    ('s', "left_shift"),
    ('M', "right_command"),
    ('O', "right_option"),
    ('C', "right_control"),
    ('S', "right_shift"),
    ('f', "fn"),
    ('F', "fn"),
    ('l', "caps_lock"),
    ('L', "caps_lock"),
    ('x', "any"),
    ('X', "any"),
    // Side-agnostic modifiers
    ('g', "command"),
    ('G', "command"),
    ('r', "control"),
    ('R', "control"),
    ('a', "option"),
    ('A', "option"),
    ('h', "shift"),
    ('H', "shift"),
];

/// Unicode modifier glyphs. A leading `‹` picks the left side, a trailing `›`
/// the right side, and a bare glyph is side-agnostic.
pub const MODIFIER_GLYPHS: &[(&str, &[&str])] = &[
    ("⌘", &["command"]),
    ("⌥", &["option"]),
    ("⌃", &["control"]),
    ("⇧", &["shift"]),
    ("‹⌘", &["left_command"]),
    ("⌘›", &["right_command"]),
    ("‹⌥", &["left_option"]),
    ("⌥›", &["right_option"]),
    ("‹⌃", &["left_control"]),
    ("⌃›", &["right_control"]),
    ("‹⇧", &["left_shift"]),
    ("⇧›", &["right_shift"]),
    ("☆", &["command", "option", "control", "shift"]),
];

static KEY_CODE_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| KEY_CODES.iter().copied().collect());

static CONSUMER_KEY_CODE_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| CONSUMER_KEY_CODES.iter().copied().collect());

static POINTING_BUTTON_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| POINTING_BUTTONS.iter().copied().collect());

/// Every key code a modifier character can expand to
static MODIFIER_NAME_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| MODIFIER_CHARS.iter().map(|(_, name)| *name).collect());

pub fn is_key_code(code: &str) -> bool {
    KEY_CODE_SET.contains(code)
}

pub fn is_consumer_key_code(code: &str) -> bool {
    CONSUMER_KEY_CODE_SET.contains(code)
}

pub fn is_pointing_button(code: &str) -> bool {
    POINTING_BUTTON_SET.contains(code)
}

/// True for key codes that name a modifier (`left_shift`, `command`, `fn`, ...)
pub fn is_modifier_name(code: &str) -> bool {
    MODIFIER_NAME_SET.contains(code)
}

pub fn is_sticky_modifier(code: &str) -> bool {
    STICKY_MODIFIERS.contains(&code)
}

/// Look up a single modifier character
pub fn modifier_char(c: char) -> Option<&'static str> {
    MODIFIER_CHARS
        .iter()
        .find(|(ch, _)| *ch == c)
        .map(|(_, name)| *name)
}

/// Find which reference table a code belongs to.
///
/// Tables are searched in priority order: key codes, consumer key codes,
/// then pointing buttons. Codes present in several tables (`mute`,
/// `rewind`, ...) resolve as plain key codes.
pub fn classify(code: &str) -> Option<EventKind> {
    if is_key_code(code) {
        Some(EventKind::KeyCode)
    } else if is_consumer_key_code(code) {
        Some(EventKind::ConsumerKeyCode)
    } else if is_pointing_button(code) {
        Some(EventKind::PointingButton)
    } else {
        None
    }
}

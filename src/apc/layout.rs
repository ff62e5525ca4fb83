//! Button and fader translation between APC mini note numbers and the
//! logical numbering used by the configuration.
//!
//! Native grid notes start at the bottom-left pad (0) and grow upward;
//! logical button 1 is the top-left pad. Round buttons and the shift
//! button follow the grid (65-72 horizontal, 73-80 vertical, 81 shift).

/// Marker for a native note or logical id with no counterpart
const UNMAPPED: u8 = 0xFF;

/// Number of physical faders (8 channel faders plus master)
pub const FADER_COUNT: u8 = 9;

/// First fader control-change number
const FIRST_FADER_CC: u8 = 48;

/// Highest logical button id
pub const MAX_LOGICAL_BUTTON: u8 = 81;

#[rustfmt::skip]
const NATIVE_TO_LOGICAL: [u8; 99] = [
    57, 58, 59, 60, 61, 62, 63, 64, // grid, bottom row
    49, 50, 51, 52, 53, 54, 55, 56,
    41, 42, 43, 44, 45, 46, 47, 48,
    33, 34, 35, 36, 37, 38, 39, 40,
    25, 26, 27, 28, 29, 30, 31, 32,
    17, 18, 19, 20, 21, 22, 23, 24,
    9, 10, 11, 12, 13, 14, 15, 16,
    1, 2, 3, 4, 5, 6, 7, 8, // grid, top row
    65, 66, 67, 68, 69, 70, 71, 72, // horizontal round buttons
    UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED,
    UNMAPPED, UNMAPPED,
    73, 74, 75, 76, 77, 78, 79, 80, // vertical round buttons
    UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED, UNMAPPED,
    81, // shift
];

#[rustfmt::skip]
const LOGICAL_TO_NATIVE: [u8; 82] = [
    UNMAPPED,
    56, 57, 58, 59, 60, 61, 62, 63,
    48, 49, 50, 51, 52, 53, 54, 55,
    40, 41, 42, 43, 44, 45, 46, 47,
    32, 33, 34, 35, 36, 37, 38, 39,
    24, 25, 26, 27, 28, 29, 30, 31,
    16, 17, 18, 19, 20, 21, 22, 23,
    8, 9, 10, 11, 12, 13, 14, 15,
    0, 1, 2, 3, 4, 5, 6, 7,
    64, 65, 66, 67, 68, 69, 70, 71,
    82, 83, 84, 85, 86, 87, 88, 89,
    98,
];

/// Translate a native note number to a logical button id
pub fn logical_button(native: u8) -> Option<u8> {
    NATIVE_TO_LOGICAL
        .get(native as usize)
        .copied()
        .filter(|&b| b != UNMAPPED)
}

/// Translate a logical button id to the native note number
pub fn native_note(logical: u8) -> Option<u8> {
    LOGICAL_TO_NATIVE
        .get(logical as usize)
        .copied()
        .filter(|&n| n != UNMAPPED)
}

/// Translate a fader control-change number to a fader id (1-9)
pub fn fader_from_cc(cc: u8) -> Option<u8> {
    if (FIRST_FADER_CC..FIRST_FADER_CC + FADER_COUNT).contains(&cc) {
        Some(cc - FIRST_FADER_CC + 1)
    } else {
        None
    }
}

/// Translate a fader id (1-9) to its control-change number
pub fn cc_from_fader(fader: u8) -> Option<u8> {
    if (1..=FADER_COUNT).contains(&fader) {
        Some(FIRST_FADER_CC + fader - 1)
    } else {
        None
    }
}

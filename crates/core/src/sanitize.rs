use crate::error::NameError;

pub const MAX_NAME_LEN: usize = 255;

const WINDOWS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM0", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
    "COM8", "COM9", "LPT0", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8",
    "LPT9",
];

/// Checks a candidate file name. The first failing rule wins.
pub fn validate_name(value: &str) -> Result<(), NameError> {
    if value.trim().is_empty() {
        return Err(NameError::Empty);
    }

    if let Some(ch) = value.chars().find(|ch| is_disallowed_char(*ch)) {
        return Err(NameError::IllegalChar(ch));
    }

    if is_windows_reserved(value) {
        return Err(NameError::Reserved(value.to_string()));
    }

    if value.chars().all(|ch| ch == '.') {
        return Err(NameError::OnlyDots);
    }

    let len = value.chars().count();
    if len > MAX_NAME_LEN {
        return Err(NameError::TooLong {
            len,
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

pub fn is_valid_name(value: &str) -> bool {
    validate_name(value).is_ok()
}

fn is_disallowed_char(ch: char) -> bool {
    matches!(ch, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || (ch as u32) < 0x20
}

fn is_windows_reserved(value: &str) -> bool {
    let stem = value
        .split('.')
        .next()
        .unwrap_or(value)
        .to_ascii_uppercase();
    WINDOWS_RESERVED_NAMES
        .iter()
        .any(|reserved| reserved == &stem)
}

//! Amtlicher Regionalschlüssel (ARS) handling.
//!
//! An ARS is a hierarchical key of up to 12 digits:
//!
//! | digits | meaning                          |
//! |--------|----------------------------------|
//! | 1–2    | state                            |
//! | 3      | administrative district          |
//! | 4–5    | district                         |
//! | 6–9    | administrative cooperation       |
//! | 10–12  | municipality                     |
//!
//! Stored identifiers are always right-padded with `0` to 12 digits.

/// Length of a stored region identifier.
pub const ARS_LENGTH: usize = 12;

/// Length of the district prefix (state + admin district + district).
pub const DISTRICT_PREFIX_LENGTH: usize = 5;

/// Length of an Amtlicher Gemeindeschlüssel (AGS).
pub const AGS_LENGTH: usize = 8;

/// Right-pad a key with zeros to [`ARS_LENGTH`]. Longer keys are returned
/// unchanged.
pub fn pad_ars(ars: &str) -> String {
    format!("{:0<width$}", ars.trim(), width = ARS_LENGTH)
}

/// Derive the key one level up.
///
/// Known key lengths step down `12 → 9 → 5 → 3 → 2 → ""`. Keys of other
/// lengths lose trailing zeros until a known length is reached; a trailing
/// non-zero digit at an unknown length ends the chain. All-zero keys have
/// no parent.
pub fn higher_ars(ars: &str) -> String {
    let mut ars = ars.trim();
    if !ars.is_ascii() || ars.trim_end_matches('0').is_empty() {
        return String::new();
    }
    loop {
        match ars.len() {
            2 => return String::new(),
            3 => return ars[..2].to_string(),
            5 => return ars[..3].to_string(),
            9 => return ars[..5].to_string(),
            12 => return ars[..9].to_string(),
            _ => {}
        }
        match ars.strip_suffix('0') {
            Some(rest) => ars = rest,
            None => return String::new(),
        }
    }
}

/// Padded keys of all potential ancestors, nearest first.
///
/// Consecutive steps that pad to the same identifier appear once, so
/// `parent_keys("110")` is `["110000000000"]`: the state key, after which
/// the chain is exhausted.
pub fn parent_keys(ars: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    let mut current = higher_ars(ars);
    while !current.is_empty() {
        let padded = pad_ars(&current);
        if keys.last() != Some(&padded) {
            keys.push(padded);
        }
        current = higher_ars(&current);
    }
    keys
}

/// Whether `parent` is an ancestor key of `child` under the length-step rule.
pub fn is_ancestor_key(parent: &str, child: &str) -> bool {
    let parent = pad_ars(parent);
    parent_keys(child).contains(&parent)
}

/// First five digits of a key: the district the region belongs to.
pub fn district_prefix(ars: &str) -> &str {
    let ars = ars.trim();
    ars.get(..DISTRICT_PREFIX_LENGTH).unwrap_or(ars)
}

/// Whether a key denotes a whole state, i.e. only its first two digits are set.
pub fn is_state_key(ars: &str) -> bool {
    let padded = pad_ars(ars);
    padded.len() == ARS_LENGTH
        && padded.bytes().all(|b| b.is_ascii_digit())
        && &padded[..2] != "00"
        && padded[2..].bytes().all(|b| b == b'0')
}

/// Convert an 8-digit AGS to a 12-digit ARS.
///
/// The four cooperation digits are not part of the AGS. For municipalities
/// without cooperation (`verbandsfrei`) they are `0` followed by the
/// municipality number; city districts (`000`) are zero-padded.
pub fn ags_to_ars(ags: &str) -> Option<String> {
    let ags = ags.trim();
    if ags.len() != AGS_LENGTH || !ags.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let municipality = &ags[DISTRICT_PREFIX_LENGTH..];
    if municipality == "000" {
        return Some(pad_ars(ags));
    }
    Some(format!(
        "{}0{municipality}{municipality}",
        &ags[..DISTRICT_PREFIX_LENGTH]
    ))
}

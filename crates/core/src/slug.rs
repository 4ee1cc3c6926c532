//! URL slug generation for region and request names.

/// Generate a URL-safe slug from a display name.
///
/// Lowercases, transliterates German and common Latin-1 letters to ASCII
/// (`ä` → `a`, `ß` → `ss`, `é` → `e`), replaces everything else that is not
/// alphanumeric with hyphens, collapses consecutive hyphens, and trims
/// leading/trailing hyphens.
pub fn slugify(name: &str) -> String {
    let mut transliterated = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        match transliterate(c) {
            Some(ascii) => transliterated.push_str(ascii),
            None if c.is_ascii_alphanumeric() => transliterated.push(c),
            None => transliterated.push('-'),
        }
    }

    // Collapse consecutive hyphens.
    let mut result = String::with_capacity(transliterated.len());
    let mut prev_hyphen = false;
    for c in transliterated.chars() {
        if c == '-' {
            if !prev_hyphen {
                result.push('-');
            }
            prev_hyphen = true;
        } else {
            result.push(c);
            prev_hyphen = false;
        }
    }

    result.trim_matches('-').to_string()
}

fn transliterate(c: char) -> Option<&'static str> {
    let ascii = match c {
        'ä' | 'à' | 'á' | 'â' | 'ã' | 'å' => "a",
        'æ' => "ae",
        'ç' | 'č' | 'ć' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'ě' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ñ' | 'ń' => "n",
        'ö' | 'ò' | 'ó' | 'ô' | 'õ' | 'ø' => "o",
        'œ' => "oe",
        'ß' => "ss",
        'š' | 'ś' => "s",
        'ü' | 'ù' | 'ú' | 'û' => "u",
        'ý' | 'ÿ' => "y",
        'ž' | 'ź' | 'ż' => "z",
        'ł' => "l",
        'ř' => "r",
        _ => return None,
    };
    Some(ascii)
}

use serde::Deserialize;

type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

#[derive(Debug, Deserialize)]
struct GenreEntry {
    name: String,
}

/// Reduces a raw genre cell to its list of genre names.
///
/// TMDB exports store genres as a Python literal such as
/// `[{'id': 28, 'name': 'Action'}, {'id': 12, 'name': 'Adventure'}]`;
/// cleaned datasets sometimes carry the same structure as JSON. Both are
/// accepted. Names come back exactly as written.
///
/// An empty or whitespace-only cell yields no genres. Anything that is not
/// a list (or tuple) of objects with a string `name` is an error.
pub fn parse_genre_field(raw: &str) -> Result<Vec<String>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<GenreEntry> = match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(_) => {
            let converted = literal_to_json(raw)?;
            serde_json::from_str(&converted).map_err(|e| e.to_string())?
        }
    };

    Ok(entries.into_iter().map(|entry| entry.name).collect())
}

/// Rewrites a Python container literal into JSON text.
///
/// Quoted strings (either quote style) are decoded and re-emitted as JSON
/// strings; `True`, `False` and `None` become their JSON spellings. Tuples
/// become arrays, trailing commas are dropped and numbers are re-emitted in
/// JSON form. Other characters pass through for serde to judge.
fn literal_to_json(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len() + 8);
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                let decoded = read_quoted(&mut chars, c)?;
                let json = serde_json::to_string(&decoded).map_err(|e| e.to_string())?;
                out.push_str(&json);
            }
            '(' => out.push('['),
            ')' => out.push(']'),
            ',' if closes_next(&chars) => {}
            c if c.is_ascii_digit() || (matches!(c, '-' | '+' | '.') && starts_number(&chars)) => {
                out.push_str(&read_number(&mut chars, c)?);
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match word.as_str() {
                    "True" => out.push_str("true"),
                    "False" => out.push_str("false"),
                    "None" => out.push_str("null"),
                    other => return Err(format!("unexpected identifier `{}`", other)),
                }
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

/// Whether the next non-blank character closes a container
fn closes_next(chars: &Chars<'_>) -> bool {
    let mut ahead = chars.clone();
    matches!(
        ahead.find(|c| !c.is_whitespace()),
        Some(']' | '}' | ')')
    )
}

/// Whether a sign or dot is followed by the rest of a number
fn starts_number(chars: &Chars<'_>) -> bool {
    let mut ahead = chars.clone();
    matches!(ahead.next(), Some(c) if c.is_ascii_digit() || c == '.')
}

/// Reads a Python int or float starting at `first` and returns its JSON form
fn read_number(chars: &mut Chars<'_>, first: char) -> Result<String, String> {
    let mut token = String::from(first);
    while let Some(&next) = chars.peek() {
        let exponent_sign =
            matches!(next, '+' | '-') && token.ends_with(|c: char| c.eq_ignore_ascii_case(&'e'));
        if next.is_ascii_alphanumeric() || matches!(next, '.' | '_') || exponent_sign {
            token.push(next);
            chars.next();
        } else {
            break;
        }
    }

    let digits = token.replace('_', "");
    if let Ok(int) = digits.parse::<i64>() {
        return Ok(int.to_string());
    }
    match digits.parse::<f64>() {
        Ok(float) if float.is_finite() => {
            serde_json::to_string(&float).map_err(|e| e.to_string())
        }
        _ => Err(format!("invalid number `{}`", token)),
    }
}

fn read_quoted(chars: &mut Chars<'_>, quote: char) -> Result<String, String> {
    let mut value = String::new();

    loop {
        let c = chars.next().ok_or("unterminated string")?;
        if c == quote {
            return Ok(value);
        }
        if c != '\\' {
            value.push(c);
            continue;
        }

        let escaped = chars.next().ok_or("unterminated escape")?;
        match escaped {
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            '\\' | '\'' | '"' => value.push(escaped),
            'x' => value.push(read_hex(chars, 2)?),
            'u' => value.push(read_hex(chars, 4)?),
            other => {
                value.push('\\');
                value.push(other);
            }
        }
    }
}

fn read_hex(chars: &mut Chars<'_>, digits: usize) -> Result<char, String> {
    let hex: String = chars.by_ref().take(digits).collect();
    if hex.len() != digits {
        return Err("truncated escape sequence".to_string());
    }
    u32::from_str_radix(&hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| format!("invalid escape sequence `{}`", hex))
}

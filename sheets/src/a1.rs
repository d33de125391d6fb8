//! A1 notation helpers.
//!
//! Rows and columns are 0-based everywhere in this crate; conversion to the
//! 1-based A1 form happens only here.

/// `0 -> A`, `25 -> Z`, `26 -> AA`.
pub fn column_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Inverse of [`column_letters`]. Case-insensitive.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n: usize = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }
    Some(n - 1)
}

/// Quotes a sheet title when A1 notation requires it.
pub fn quote_sheet(title: &str) -> String {
    let plain = !title.is_empty()
        && title
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !title.starts_with(|c: char| c.is_ascii_digit());
    if plain {
        title.to_string()
    } else {
        format!("'{}'", title.replace('\'', "''"))
    }
}

pub fn whole_sheet(sheet: &str) -> String {
    quote_sheet(sheet)
}

pub fn cell(sheet: &str, row: usize, col: usize) -> String {
    format!("{}!{}{}", quote_sheet(sheet), column_letters(col), row + 1)
}

pub fn range(sheet: &str, start: (usize, usize), end: (usize, usize)) -> String {
    format!(
        "{}!{}{}:{}{}",
        quote_sheet(sheet),
        column_letters(start.1),
        start.0 + 1,
        column_letters(end.1),
        end.0 + 1
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: usize,
    pub col: usize
}

/// A parsed A1 range. `start`/`end` are `None` for a whole-sheet range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub sheet: String,
    pub start: Option<CellRef>,
    pub end: Option<CellRef>
}

impl A1Range {
    pub fn is_whole_sheet(&self) -> bool {
        self.start.is_none()
    }
}

pub fn parse(input: &str) -> Result<A1Range, String> {
    let (sheet, rest) = split_sheet(input)?;
    let Some(rest) = rest else {
        return Ok(A1Range {
            sheet,
            start: None,
            end: None
        });
    };

    let (first, second) = match rest.split_once(':') {
        Some((a, b)) => (a, Some(b)),
        None => (rest, None)
    };
    let start = parse_cell(first)?;
    let end = match second {
        Some(b) => parse_cell(b)?,
        None => start
    };
    Ok(A1Range {
        sheet,
        start: Some(start),
        end: Some(end)
    })
}

fn split_sheet(input: &str) -> Result<(String, Option<&str>), String> {
    if let Some(quoted) = input.strip_prefix('\'') {
        let mut title = String::new();
        let mut chars = quoted.char_indices().peekable();
        while let Some((i, ch)) = chars.next() {
            if ch == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    chars.next();
                    title.push('\'');
                    continue;
                }
                let rest = &quoted[i + 1..];
                return match rest.strip_prefix('!') {
                    Some(cells) => Ok((title, Some(cells))),
                    None if rest.is_empty() => Ok((title, None)),
                    None => Err(format!("unexpected text after sheet name in '{input}'"))
                };
            }
            title.push(ch);
        }
        return Err(format!("unterminated sheet name in '{input}'"));
    }

    match input.rsplit_once('!') {
        Some((sheet, cells)) => Ok((sheet.to_string(), Some(cells))),
        None => Ok((input.to_string(), None))
    }
}

fn parse_cell(text: &str) -> Result<CellRef, String> {
    let split = text
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| format!("cell reference '{text}' has no row"))?;
    let (letters, digits) = text.split_at(split);
    let col = column_index(letters).ok_or_else(|| format!("bad column in '{text}'"))?;
    let row: usize = digits
        .parse()
        .map_err(|_| format!("bad row in '{text}'"))?;
    if row == 0 {
        return Err(format!("row 0 in '{text}'"));
    }
    Ok(CellRef { row: row - 1, col })
}

/// Split pasted CSV text into trimmed cells. Quoted fields may contain commas;
/// `""` inside quotes is a literal quote. Blank input yields no rows.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    text.lines()
        .map(|line| {
            parse_csv_record(line.strip_suffix('\r').unwrap_or(line))
                .into_iter()
                .map(|c| c.trim().to_string())
                .collect()
        })
        .collect()
}

fn parse_csv_record(line: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0usize;
    while i < chars.len() {
        let ch = chars[i];
        if ch == '"' {
            if in_quotes && i + 1 < chars.len() && chars[i + 1] == '"' {
                buf.push('"');
                i += 2;
                continue;
            }
            in_quotes = !in_quotes;
            i += 1;
            continue;
        }
        if ch == ',' && !in_quotes {
            out.push(buf);
            buf = String::new();
            i += 1;
            continue;
        }
        buf.push(ch);
        i += 1;
    }
    out.push(buf);
    out
}

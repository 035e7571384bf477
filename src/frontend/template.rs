// Print-literal interpolation: `「合計は”A”です」` becomes the printf template
// `合計は%gです\n` plus the ids of the embedded variables, in order.

use super::ast::Template;
use super::lexer::VARIABLE_QUOTE;
use super::symbols::VarId;

/// A literal ending with this character is printed without a trailing newline.
pub const SUPPRESS_NEWLINE: char = '＼';

pub const NUMBER_PLACEHOLDER: &str = "%g";

/// Build a template from raw literal content. `resolve` maps an embedded
/// variable name to its id and decides what an unknown name means.
pub fn build_template<E>(
    raw: &str,
    mut resolve: impl FnMut(&str) -> Result<VarId, E>,
) -> Result<Template, E> {
    let (body, newline) = match raw.strip_suffix(SUPPRESS_NEWLINE) {
        Some(body) => (body, false),
        None => (raw, true),
    };
    let chars: Vec<char> = body.chars().collect();
    let mut format = String::with_capacity(body.len() + 2);
    let mut args = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if ch == VARIABLE_QUOTE {
            let close = chars[i + 1..].iter().position(|&c| c == VARIABLE_QUOTE);
            if let Some(len) = close {
                let name: String = chars[i + 1..i + 1 + len].iter().collect();
                args.push(resolve(&name)?);
                format.push_str(NUMBER_PLACEHOLDER);
                i += len + 2;
                continue;
            }
        }
        push_escaped(&mut format, ch);
        i += 1;
    }
    if newline {
        format.push_str("\\n");
    }
    Ok(Template { format, args })
}

fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        '%' => out.push_str("%%"),
        _ => out.push(ch),
    }
}

/// Number of conversions in a template built by [`build_template`].
pub fn count_placeholders(format: &str) -> usize {
    let mut count = 0;
    let mut rest = format;
    while let Some(pos) = rest.find('%') {
        let tail = &rest[pos + 1..];
        if tail.starts_with('%') {
            rest = &tail[1..];
        } else {
            count += 1;
            rest = tail;
        }
    }
    count
}

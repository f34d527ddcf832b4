//! Rendering of the comment map into Go source

use mapcomments_core::CommentMap;
use minijinja::{Environment, context};
use std::fmt::Write;

const TEMPLATE_NAME: &str = "commentmap.go.tmpl";
const TEMPLATE_SOURCE: &str = include_str!("../templates/commentmap.go.tmpl");

fn environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env.add_filter("quote", go_quote);
    env.add_template(TEMPLATE_NAME, TEMPLATE_SOURCE)?;
    Ok(env)
}

/// Render the Go file declaring `var CommentMap` in package `package`.
///
/// Entries appear in key order. With `mpl2` the file starts with the
/// MPL-2.0 license notice.
pub fn render_comment_map(
    package: &str,
    comments: &CommentMap,
    mpl2: bool,
) -> Result<String, minijinja::Error> {
    let env = environment()?;
    let template = env.get_template(TEMPLATE_NAME)?;
    template.render(context! {
        package => package,
        comment_map => comments,
        mpl2 => mpl2,
    })
}

/// Quote `s` as a Go interpreted string literal, like `strconv.Quote`.
pub fn go_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0b}' => out.push_str("\\v"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if is_printable(c) => out.push(c),
            c if (c as u32) < 0x10000 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => {
                let _ = write!(out, "\\U{:08x}", c as u32);
            }
        }
    }
    out.push('"');
    out
}

/// Close to Go's `strconv.IsPrint`: letters, marks, numbers, punctuation,
/// symbols and the ASCII space.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    !(c.is_control() || c.is_whitespace() || is_format_or_unassigned(c))
}

fn is_format_or_unassigned(c: char) -> bool {
    matches!(
        c,
        '\u{00ad}'
            | '\u{200b}'..='\u{200f}'
            | '\u{2028}'..='\u{202e}'
            | '\u{2060}'..='\u{206f}'
            | '\u{feff}'
            | '\u{fff9}'..='\u{fffb}'
            | '\u{fffe}'..='\u{ffff}'
            | '\u{e000}'..='\u{f8ff}'
    )
}

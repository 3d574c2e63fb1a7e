//! Human-readable command lines for log events.

use redis::{Arg, Cmd};

/// Longest argument rendered verbatim
const MAX_ARG_LEN: usize = 64;

/// Commands whose arguments are credentials
const SECRET_COMMANDS: [&str; 2] = ["AUTH", "HELLO"];

/// Render a command as `NAME arg arg`, masking credentials and eliding long
/// or binary arguments.
pub(crate) fn render_command(cmd: &Cmd) -> String {
    let mut parts = cmd.args_iter();
    let Some(name) = parts.next().map(render_arg) else {
        return String::new();
    };

    if SECRET_COMMANDS
        .iter()
        .any(|secret| name.eq_ignore_ascii_case(secret))
    {
        return format!("{name} ***");
    }

    parts.fold(name, |mut line, arg| {
        line.push(' ');
        line.push_str(&render_arg(arg));
        line
    })
}

fn render_arg(arg: Arg<&[u8]>) -> String {
    match arg {
        Arg::Simple(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) if text.len() <= MAX_ARG_LEN => text.to_string(),
            Ok(text) => {
                let cut = (0..=MAX_ARG_LEN)
                    .rev()
                    .find(|i| text.is_char_boundary(*i))
                    .unwrap_or(0);
                format!("{}...({} bytes)", &text[..cut], bytes.len())
            }
            Err(_) => format!("<{} bytes>", bytes.len()),
        },
        Arg::Cursor => "<cursor>".to_string(),
    }
}

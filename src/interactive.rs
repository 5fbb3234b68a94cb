use colored::Colorize;
use std::io::{self, BufRead, Write};

pub const DEFAULT_ISSUES: u32 = 10;

/// Ask for a positive integer. Blank input, EOF or anything unparsable
/// falls back to `default`.
pub fn prompt_for_count<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
    default: u32,
) -> io::Result<u32> {
    write!(output, "{question} [{default}]: ")?;
    output.flush()?;

    let Some(raw) = read_trimmed(input)? else {
        return Ok(default);
    };
    if raw.is_empty() {
        return Ok(default);
    }
    match raw.parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => {
            writeln!(output, "{}", "Invalid number, using default.".yellow())?;
            Ok(default)
        }
    }
}

/// Ask for optional free text. Blank input or EOF means none.
pub fn prompt_for_optional_text<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> io::Result<Option<String>> {
    write!(output, "{question} (leave blank for none): ")?;
    output.flush()?;
    Ok(read_trimmed(input)?.filter(|s| !s.is_empty()))
}

/// Read one line, trimmed. `None` on EOF.
fn read_trimmed<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

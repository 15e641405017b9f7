use std::io::Write;

use crate::frontend::parser_wrapper::{parse_invocation, parse_str, ParseError};
use tracing::debug;
/*
A fixed corpus of sources, run against the parser by the selftest command.
Every source of VALID must parse, every source of INVALID must be rejected.
INVOCATIONS are rejected by the invocation parser, where a module call is required.
*/

const VALID: [&str; 5] = ["a.b.c", "a||b", "[a||b]", "x^5", "modA()"];
const INVALID: [&str; 4] = ["a|b", ".a", "[a.b", "a^^2"];
const INVALID_INVOCATIONS: [&str; 1] = ["modA"];

fn check_valid<W: Write>(out: &mut W, src: &str) -> std::io::Result<bool> {
    match parse_str(src) {
        Ok(_) => {
            writeln!(out, "OK: {}", src)?;
            Ok(true)
        }
        Err(e) => {
            writeln!(out, "FAIL(valid): {} ({})", src, e)?;
            Ok(false)
        }
    }
}

fn check_invalid<W: Write, T>(
    out: &mut W,
    src: &str,
    parse: impl Fn(&str) -> Result<T, ParseError>,
) -> std::io::Result<bool> {
    match parse(src) {
        Ok(_) => {
            writeln!(out, "FAIL(invalid): {}", src)?;
            Ok(false)
        }
        Err(e) => {
            debug!(source = src, error = %e, "rejected as expected");
            writeln!(out, "OK(invalid): {}", src)?;
            Ok(true)
        }
    }
}

//runs the whole corpus, returns true if every case behaved
pub fn run<W: Write>(out: &mut W) -> std::io::Result<bool> {
    let mut success = true;
    for src in VALID.iter() {
        success &= check_valid(out, src)?;
    }
    for src in INVALID.iter() {
        success &= check_invalid(out, src, parse_str)?;
    }
    for src in INVALID_INVOCATIONS.iter() {
        success &= check_invalid(out, src, parse_invocation)?;
    }
    Ok(success)
}

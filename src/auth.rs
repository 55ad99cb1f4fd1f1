use anyhow::{Result, bail};
use std::io::{self, IsTerminal};
use zeroize::Zeroizing;

pub const PASSPHRASE_ENV: &str = "USMKEY_PASSPHRASE";

/// Looks for the passphrase in `USMKEY_PASSPHRASE`, then on piped stdin,
/// then asks on the terminal. Empty values fall through to the next source.
pub fn read_passphrase() -> Result<Zeroizing<String>> {
    if let Ok(from_env) = std::env::var(PASSPHRASE_ENV) {
        if !from_env.is_empty() {
            return Ok(Zeroizing::new(from_env));
        }
    }

    // only the first line of piped input is the passphrase
    if !io::stdin().is_terminal() {
        let mut line = Zeroizing::new(String::new());
        io::stdin().read_line(&mut line)?;
        trim_newline(&mut line);

        if !line.is_empty() {
            return Ok(line);
        }
    }

    if io::stdin().is_terminal() {
        let typed = Zeroizing::new(rpassword::prompt_password("Passphrase: ")?);
        if !typed.is_empty() {
            return Ok(typed);
        }
    }

    bail!("no passphrase given: set {PASSPHRASE_ENV}, pipe it on stdin or run from a terminal")
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}

use anyhow::{Result, bail};
use std::io::{self, Write};

pub fn prompt_string(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut s = String::new();
    if io::stdin().read_line(&mut s)? == 0 {
        bail!("no input");
    }
    Ok(s.trim_end_matches(['\r', '\n']).to_string())
}

/// Ask until the answer isn't blank.
pub fn prompt_required(prompt: &str) -> Result<String> {
    loop {
        let answer = prompt_string(prompt)?;
        if !answer.trim().is_empty() {
            return Ok(answer);
        }
    }
}

pub fn prompt_password_hidden(prompt: &str) -> Result<String> {
    let pw = rpassword::prompt_password(prompt)?;
    Ok(pw)
}

/// New master password, typed twice.
pub fn prompt_new_password() -> Result<String> {
    let password = prompt_password_hidden("New master password: ")?;
    if password.is_empty() {
        bail!("The master password can't be empty");
    }
    let confirm = prompt_password_hidden("Confirm master password: ")?;
    if password != confirm {
        bail!("Passwords do not match");
    }
    Ok(password)
}

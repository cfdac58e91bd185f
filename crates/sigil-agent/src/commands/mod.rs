pub mod init;
pub mod issue;
pub mod resolve;
pub mod verify;

use anyhow::Context;
use std::io::Read;
use std::path::Path;

/// Command input given inline, as a file path, or as `-` for stdin.
pub fn read_input(value: &str) -> anyhow::Result<String> {
    if value == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading stdin")?;
        return Ok(text);
    }
    let path = Path::new(value);
    if path.is_file() {
        return std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()));
    }
    Ok(value.to_string())
}

// zbxctl - CLI for the Zabbix JSON-RPC API
// Copyright (C) 2024 zbxctl contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Interactive input: confirmations, free-text answers and the password.

use anyhow::{Context, Result};
use std::env;
use std::io::{self, BufRead, StdinLock, Stdout, Write};

pub const PASSWORD_ENV: &str = "ZBXCTL_PASSWORD";

/// Source of answers for the questions an operation asks mid-run.
pub trait Prompt {
    fn ask(&mut self, question: &str) -> Result<String>;

    /// Only the exact answer `y` counts as yes.
    fn confirm(&mut self, question: &str) -> Result<bool> {
        Ok(self.ask(question)? == "y")
    }
}

pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}

impl LinePrompt<StdinLock<'static>, Stdout> {
    pub fn terminal() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question}").context("writing prompt")?;
        self.output.flush().context("flushing prompt")?;

        let mut line = String::new();
        self.input.read_line(&mut line).context("reading answer")?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// `ZBXCTL_PASSWORD` when set, otherwise a hidden terminal prompt.
pub fn read_password() -> Result<String> {
    if let Ok(password) = env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    rpassword::prompt_password("Password: ").context("reading password")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scripted(answers: &str) -> LinePrompt<Cursor<Vec<u8>>, Vec<u8>> {
        LinePrompt::new(Cursor::new(answers.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn only_exact_y_confirms() {
        let mut prompt = scripted("y\nY\nyes\n\n y\n");
        assert!(prompt.confirm("ok? ").unwrap());
        assert!(!prompt.confirm("ok? ").unwrap());
        assert!(!prompt.confirm("ok? ").unwrap());
        assert!(!prompt.confirm("ok? ").unwrap());
        assert!(!prompt.confirm("ok? ").unwrap());
    }

    #[test]
    fn end_of_input_reads_as_empty_answer() {
        let mut prompt = scripted("");
        assert_eq!(prompt.ask("map name: ").unwrap(), "");
        assert!(!prompt.confirm("sure? (y/n): ").unwrap());
    }

    #[test]
    fn writes_question_and_strips_line_ending() {
        let mut prompt = scripted("core-switches\r\n");
        assert_eq!(prompt.ask("map name: ").unwrap(), "core-switches");
        assert_eq!(String::from_utf8(prompt.into_output()).unwrap(), "map name: ");
    }
}

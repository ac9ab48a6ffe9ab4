use std::io::{self, Write};

use taurus_core::Prompt;

/// Prompt reading from the terminal. Secret fields are read without echo.
pub struct StdinPrompt;

impl StdinPrompt {
    fn read_line() -> io::Result<String> {
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }
}

impl Prompt for StdinPrompt {
    fn confirm(&mut self, message: &str) -> io::Result<bool> {
        print!("{} Press 0 to proceed: ", message);
        io::stdout().flush()?;
        Ok(Self::read_line()? == "0")
    }

    fn ask(&mut self, label: &str, secret: bool) -> io::Result<String> {
        let question = format!("Enter {}: ", label);
        if secret {
            return rpassword::prompt_password(question);
        }
        print!("{}", question);
        io::stdout().flush()?;
        Self::read_line()
    }
}

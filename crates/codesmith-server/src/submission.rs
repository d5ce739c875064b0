use codesmith::agent::Request;
use codesmith::tools::{ExplainCodeRequest, GenerateCodeRequest};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Write,
    Explain,
}

/// What the user asked for, from either the form or the JSON endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub text: String,
}

impl Submission {
    /// The warning to show instead of calling the model, if any
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.language.trim().is_empty() || self.text.trim().is_empty() {
            return Err("Please provide both the programming language and the task/code.");
        }
        Ok(())
    }

    /// The mode selects the tool, the code to explain is passed through untouched
    pub fn request(&self) -> Request {
        let language = self.language.trim();
        match self.mode {
            Mode::Write => {
                Request::GenerateCode(GenerateCodeRequest::new(language, self.text.trim()))
            }
            Mode::Explain => {
                Request::ExplainCode(ExplainCodeRequest::new(language, self.text.as_str()))
            }
        }
    }
}

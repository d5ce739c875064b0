use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Write and explain code with a hosted chat model", long_about = None)]
pub struct Cli {
    /// Model to use (defaults to OPENAI_MODEL_NAME, then gpt-3.5-turbo-0125)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Print the agent's intermediate steps to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Render the result with syntax highlighting instead of printing it raw
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate code for a given task in the target language
    Write {
        /// Programming language (e.g. python, javascript)
        #[arg(short, long)]
        language: String,

        /// Task description to generate code for
        #[arg(short, long)]
        task: String,
    },

    /// Explain what the provided code does
    Explain {
        /// Programming language of the code
        #[arg(short, long)]
        language: String,

        /// Code snippet to explain
        #[arg(short, long)]
        code: String,
    },
}

impl Command {
    pub fn language(&self) -> &str {
        match self {
            Command::Write { language, .. } | Command::Explain { language, .. } => language,
        }
    }
}

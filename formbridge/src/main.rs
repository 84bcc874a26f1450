//! Offline tooling for formbridge form definitions.
//!
//! `check-form` validates a definition file, `preview` runs a set of answers
//! through the submission engine without touching the remote API, and `pkce`
//! prints a fresh verifier/challenge/state triple for manual OAuth testing.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};

use formbridge::core::form::Form;
use formbridge::core::pkce::{generate_challenge_pair, generate_state};
use formbridge::core::rules::visibility_map;
use formbridge::core::submission::process_submission;
use formbridge::core::types::AnswersMap;
use formbridge::error::Error;
use formbridge::exit_codes;
use formbridge::forms::parse_form_draft;
use formbridge::logging;

#[derive(Parser)]
#[command(
    name = "formbridge",
    version,
    about = "Conditional forms that write to Airtable"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a form definition against the schema and form invariants.
    CheckForm {
        /// Path to the form definition (JSON).
        file: PathBuf,
    },
    /// Evaluate answers against a form definition and print the outcome.
    Preview {
        /// Path to the form definition (JSON).
        form: PathBuf,
        /// Path to the answers map (JSON object keyed by questionKey).
        answers: PathBuf,
    },
    /// Print a PKCE verifier, its S256 challenge and an OAuth state value.
    Pkce,
}

fn main() -> ExitCode {
    logging::init();
    match run() {
        Ok(code) => exit_code(code),
        Err(err) => {
            eprintln!("{:#}", err);
            exit_code(exit_codes::INVALID)
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::CheckForm { file } => cmd_check_form(&file),
        Command::Preview { form, answers } => cmd_preview(&form, &answers),
        Command::Pkce => cmd_pkce(),
    }
}

fn cmd_check_form(path: &Path) -> Result<i32> {
    let raw = read_json(path)?;
    match parse_form_draft(&raw) {
        Ok(draft) => {
            println!("ok: {} question(s)", draft.questions.len());
            Ok(exit_codes::OK)
        }
        Err(Error::InvalidForm(messages)) => {
            for message in &messages {
                eprintln!("{}", message);
            }
            Ok(exit_codes::INVALID)
        }
        Err(err) => Err(err.into()),
    }
}

fn cmd_preview(form_path: &Path, answers_path: &Path) -> Result<i32> {
    let draft = match parse_form_draft(&read_json(form_path)?) {
        Ok(draft) => draft,
        Err(Error::InvalidForm(messages)) => {
            for message in &messages {
                eprintln!("{}", message);
            }
            return Ok(exit_codes::INVALID);
        }
        Err(err) => return Err(err.into()),
    };
    let answers: AnswersMap = serde_json::from_value(read_json(answers_path)?)
        .with_context(|| format!("answers in {} must be a JSON object", answers_path.display()))?;

    let now = Utc::now();
    let form = Form {
        id: "preview".to_string(),
        owner_user_id: String::new(),
        name: draft.name,
        description: draft.description,
        airtable_base_id: draft.airtable_base_id,
        airtable_table_id: draft.airtable_table_id,
        questions: draft.questions,
        created_at: now,
        updated_at: now,
    };

    let visibility = visibility_map(&form, &answers);
    match process_submission(&form, &answers) {
        Ok(record) => {
            print_json(&json!({ "visibility": visibility, "fields": record }))?;
            Ok(exit_codes::OK)
        }
        Err(errors) => {
            print_json(&json!({ "visibility": visibility, "errors": errors }))?;
            Ok(exit_codes::REJECTED)
        }
    }
}

fn cmd_pkce() -> Result<i32> {
    let pair = generate_challenge_pair();
    print_json(&json!({
        "verifier": pair.verifier,
        "challenge": pair.challenge,
        "state": generate_state(),
    }))?;
    Ok(exit_codes::OK)
}

fn read_json(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{}", payload);
    Ok(())
}

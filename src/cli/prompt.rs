//! Interactive prompts on stdin

use std::io::{self, BufRead, Write};

use crate::errors::{AppError, Result};

const RANGE_HELP: &str = "a - Pick all
n - Pick none
<list-of-numbers> - Comma or space-separated list of indices
? - Print help";

const SINGLE_HELP: &str = "<number> - Single index
? - Print help";

/// Parsed answer to a multi-item prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Nothing,
    Indices(Vec<usize>),
    Help,
    OutOfRange,
}

/// Interpret an answer for `count` items
pub fn parse_selection(answer: &str, count: usize) -> Selection {
    let answer = answer.trim();
    match answer {
        "a" => return Selection::All,
        "n" => return Selection::Nothing,
        "" | "?" => return Selection::Help,
        _ => {}
    }

    let parts = answer
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|part| !part.is_empty());

    let mut indices = Vec::new();
    for part in parts {
        match part.parse::<usize>() {
            Ok(index) if index < count => {
                if !indices.contains(&index) {
                    indices.push(index);
                }
            }
            Ok(_) => return Selection::OutOfRange,
            Err(_) => return Selection::Help,
        }
    }
    Selection::Indices(indices)
}

/// Numbered list of options
pub fn format_options<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{} - {}", i, item.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn read_answer(message: &str) -> Result<String> {
    println!("{message}");
    print!("> ");
    io::stdout().flush().map_err(AppError::Io)?;

    let mut answer = String::new();
    let read = io::stdin().lock().read_line(&mut answer).map_err(AppError::Io)?;
    if read == 0 {
        return Err(AppError::generic("No answer on standard input"));
    }
    Ok(answer)
}

/// Ask for any number of items, returning their indices
pub fn prompt_indices<S: AsRef<str>>(items: &[S], message: &str) -> Result<Vec<usize>> {
    let message = format!("{message} [a/n/<list-of-numbers>/?]");
    loop {
        println!("{}", format_options(items));
        match parse_selection(&read_answer(&message)?, items.len()) {
            Selection::All => return Ok((0..items.len()).collect()),
            Selection::Nothing => return Ok(Vec::new()),
            Selection::Indices(indices) => return Ok(indices),
            Selection::Help => println!("{RANGE_HELP}\n"),
            Selection::OutOfRange => {
                println!("Please enter indices between 0 and {}.", items.len().saturating_sub(1))
            }
        }
    }
}

/// Ask for exactly one item
pub fn prompt_index<S: AsRef<str>>(items: &[S], message: &str) -> Result<usize> {
    let message = format!("{message} [<number>/?]");
    loop {
        println!("{}", format_options(items));
        let answer = read_answer(&message)?;
        match answer.trim().parse::<usize>() {
            Ok(index) if index < items.len() => return Ok(index),
            Ok(_) => println!("Please enter an index between 0 and {}.", items.len().saturating_sub(1)),
            Err(_) => println!("{SINGLE_HELP}\n"),
        }
    }
}

/// Yes/no question, `default` on an empty answer
pub fn confirm(message: &str, default: bool) -> Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    loop {
        let answer = read_answer(&format!("{message} {hint}"))?;
        match answer.trim().to_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => println!("Please answer y or n."),
        }
    }
}

//! Interactive review loop over line commands.

use std::io::Write as _;
use std::path::PathBuf;

use chrono::Utc;
use nietdoen_collect::{CollectSession, SaveError, SourceImage};
use nietdoen_core::{Edit, Language};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::display;

const HELP: &str = "\
commands:
  show                  redisplay the form
  set <field> <value>   set a field (lists: comma separated)
  clear <field>         empty a field
  validate              check the form without saving
  save                  validate and write the record
  analyze               analyze the selected image again
  select <path>         pick a new image (discards the current record)
  remove                remove the image and its record
  language <lang>       dutch or english
  quit                  leave without saving";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show,
    Edit(Edit),
    Validate,
    Save,
    Analyze,
    Select(PathBuf),
    Remove,
    Language(Language),
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match verb {
        "show" | "s" => Command::Show,
        "set" => {
            let (field, input) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if field.is_empty() {
                return Err("usage: set <field> <value>".into());
            }
            Command::Edit(Edit::Set {
                field: field.to_string(),
                input: input.trim_start().to_string(),
            })
        }
        "clear" => {
            if rest.is_empty() {
                return Err("usage: clear <field>".into());
            }
            Command::Edit(Edit::Clear {
                field: rest.to_string(),
            })
        }
        "validate" | "v" => Command::Validate,
        "save" => Command::Save,
        "analyze" | "retry" => Command::Analyze,
        "select" => {
            if rest.is_empty() {
                return Err("usage: select <path>".into());
            }
            Command::Select(PathBuf::from(rest))
        }
        "remove" => Command::Remove,
        "language" | "lang" => Command::Language(rest.parse()?),
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(format!("unknown command: {other} (try `help`)")),
    };
    Ok(Some(command))
}

async fn analyze(session: &mut CollectSession) {
    println!("Analyzing...");
    if let Err(e) = session.analyze().await {
        eprintln!("Analysis failed: {e}");
    }
    print!("{}", display::form(session, None, Utc::now()));
}

/// Run one command. Returns `false` when the loop should end.
pub async fn execute(session: &mut CollectSession, command: Command) -> bool {
    match command {
        Command::Show => print!("{}", display::form(session, None, Utc::now())),
        Command::Edit(edit) => match session.edit(edit) {
            Ok(()) => print!("{}", display::form(session, None, Utc::now())),
            Err(e) => eprintln!("{e}"),
        },
        Command::Validate => match session.validate() {
            Ok(()) => println!("Record is valid."),
            Err(SaveError::Invalid(errors)) => {
                print!("{}", display::form(session, Some(&errors), Utc::now()))
            }
            Err(e) => eprintln!("{e}"),
        },
        Command::Save => match session.save().await {
            Ok(written) => {
                print!("{}", display::saved(&written));
                println!("Select another image with `select <path>`, or `quit`.");
            }
            Err(SaveError::Invalid(errors)) => {
                print!("{}", display::form(session, Some(&errors), Utc::now()))
            }
            Err(e) => eprintln!("Save failed: {e}"),
        },
        Command::Analyze => analyze(session).await,
        Command::Select(path) => match SourceImage::from_path(&path) {
            Ok(image) => {
                session.select_image(image);
                analyze(session).await;
            }
            Err(e) => eprintln!("{e}"),
        },
        Command::Remove => {
            session.remove_image();
            println!("Image removed.");
        }
        Command::Language(language) => {
            session.set_language(language);
            println!("Language set to {language}; `analyze` to apply it to the extraction.");
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
    }
    true
}

/// Read commands until `quit` or end of input.
pub async fn run<R>(session: &mut CollectSession, lines: &mut Lines<R>) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    println!("Type `help` for commands.");
    loop {
        print!("[{}]> ", session.stage());
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(command)) => {
                if !execute(session, command).await {
                    break;
                }
            }
            Err(message) => eprintln!("{message}"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        parse_command(line).unwrap().unwrap()
    }

    #[test]
    fn blank_line_is_nothing() {
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn set_keeps_the_rest_of_the_line() {
        assert_eq!(
            parse("set colors red,  white"),
            Command::Edit(Edit::Set {
                field: "colors".into(),
                input: "red,  white".into(),
            })
        );
        assert_eq!(
            parse("set text"),
            Command::Edit(Edit::Set {
                field: "text".into(),
                input: String::new(),
            })
        );
        assert!(parse_command("set").is_err());
    }

    #[test]
    fn other_commands() {
        assert_eq!(
            parse("clear symbols"),
            Command::Edit(Edit::Clear {
                field: "symbols".into()
            })
        );
        assert_eq!(parse("lang en"), Command::Language(Language::English));
        assert_eq!(parse("select /tmp/a.png"), Command::Select("/tmp/a.png".into()));
        assert_eq!(parse("q"), Command::Quit);
        assert_eq!(parse("save"), Command::Save);
        assert!(parse_command("language klingon").is_err());
        assert!(parse_command("dance").is_err());
    }
}

extern crate ansi_term;
extern crate ctrlc;
extern crate linefeed;
use crate::lang::BUILTIN_NAMES;
use crate::mach::{Interp, Stack, Val};
use ansi_term::Style;
use linefeed::{Completer, Completion, Interface, Prompter, ReadResult, Terminal};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub fn main() {
    let mut interp = Interp::new();
    let interrupted = interp.interrupt_flag();
    ctrlc::set_handler(move || {
        interrupted.store(true, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl-C handler");
    if let Err(error) = main_loop(&mut interp) {
        eprintln!("{}", error);
    }
}

fn main_loop(interp: &mut Interp) -> std::io::Result<()> {
    splash();
    let command = Interface::new("mm15")?;
    command.set_prompt("MM_RPN>> ")?;
    command.set_history_size(1000);

    let config = config_dir();
    if let Some(dir) = &config {
        let _ = command.load_history(dir.join(HISTORY_FILE));
        load_config(interp, dir);
        load_words(interp, dir);
    }

    let mut undo_stack = Stack::new();
    loop {
        command.set_completer(Arc::new(WordCompleter::new(interp)));
        let line = match command.read_line()? {
            ReadResult::Input(line) => line,
            ReadResult::Signal(_) | ReadResult::Eof => break,
        };
        let line = line.trim().to_string();
        if line == "q" {
            break;
        }
        if !line.is_empty() {
            command.add_history_unique(line.clone());
        }
        // a Ctrl-C pressed at the prompt is not aimed at the next line
        let _ = interp.check_interrupt();

        if let Some(cmd) = line.strip_prefix('!') {
            run_shell(interp, cmd);
        } else if line == "undo" {
            interp.stack = undo_stack.clone();
        } else {
            undo_stack = interp.stack.clone();
            if let Err(error) = interp.evaluate_line(&line) {
                command.write_fmt(format_args!(
                    "{}\n",
                    Style::new().bold().paint(error.to_string())
                ))?;
            }
        }

        if !interp.suppress_print {
            print_stack(interp, &command)?;
        }
        interp.suppress_print = false;
    }

    if let Some(dir) = &config {
        if std::fs::create_dir_all(dir).is_ok() {
            let _ = command.save_history(dir.join(HISTORY_FILE));
            save_config(interp, dir);
            save_words(interp, dir);
        }
    }
    Ok(())
}

fn splash() {
    println!(
        "{}  v{}",
        Style::new().bold().paint("Mico's MM-15 Calculator"),
        env!("CARGO_PKG_VERSION")
    );
    println!("'help' for an overview, 'q' to quit, 'undo' to restore the stack");
}

/// The whole stack, bottom first, with each line labelled by its depth
/// below the top.
fn print_stack<Term: Terminal>(interp: &Interp, command: &Interface<Term>) -> std::io::Result<()> {
    let len = interp.stack.len();
    for (i, val) in interp.stack.iter().enumerate() {
        command.write_fmt(format_args!(
            "{}: {}\n",
            len - 1 - i,
            val.render(interp.precision, interp.fixed_point)
        ))?;
    }
    Ok(())
}

/// `!cmd` runs a shell command and pushes its trimmed stdout as a string.
fn run_shell(interp: &mut Interp, cmd: &str) {
    match std::process::Command::new("sh").arg("-c").arg(cmd).output() {
        Ok(output) => {
            let text = String::from_utf8_lossy(&output.stdout)
                .trim_end()
                .to_string();
            if let Err(error) = interp.stack.push(Val::Str(text)) {
                eprintln!("{}", error);
            }
            if !output.status.success() {
                eprintln!("command exited with status {}", output.status);
            }
        }
        Err(error) => eprintln!("{}", error),
    }
}

struct WordCompleter {
    names: Vec<String>,
}

impl WordCompleter {
    fn new(interp: &Interp) -> WordCompleter {
        let mut names: Vec<String> = BUILTIN_NAMES.iter().map(|n| n.to_string()).collect();
        names.extend(interp.words.keys().cloned());
        names.sort();
        WordCompleter { names }
    }
}

impl<Term: Terminal> Completer<Term> for WordCompleter {
    fn complete(
        &self,
        word: &str,
        _prompter: &Prompter<Term>,
        _start: usize,
        _end: usize,
    ) -> Option<Vec<Completion>> {
        let comp_list: Vec<Completion> = self
            .names
            .iter()
            .filter(|name| name.starts_with(word))
            .map(|name| Completion::simple(name.clone()))
            .collect();
        if comp_list.is_empty() {
            None
        } else {
            Some(comp_list)
        }
    }
}

const HISTORY_FILE: &str = "history.txt";
const CONFIG_FILE: &str = "config.txt";
const WORDS_FILE: &str = "user_words.txt";

fn config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config").join("mm15"))
}

fn load_config(interp: &mut Interp, dir: &PathBuf) {
    let text = match std::fs::read_to_string(dir.join(CONFIG_FILE)) {
        Ok(text) => text,
        Err(_) => return,
    };
    for line in text.lines() {
        let mut parts = line.splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some("precision"), Some(v)) => {
                if let Ok(n) = v.trim().parse::<usize>() {
                    if n <= 17 {
                        interp.precision = n;
                    }
                }
            }
            (Some("fixed"), Some(v)) => interp.fixed_point = v.trim() == "true",
            _ => {}
        }
    }
}

fn save_config(interp: &Interp, dir: &PathBuf) {
    let text = format!(
        "precision={}\nfixed={}\n",
        interp.precision, interp.fixed_point
    );
    if let Err(error) = std::fs::write(dir.join(CONFIG_FILE), text) {
        eprintln!("{}", error);
    }
}

/// User words persist as one definition per line, in the same `: name
/// body ;` form the evaluator accepts.
fn load_words(interp: &mut Interp, dir: &PathBuf) {
    let text = match std::fs::read_to_string(dir.join(WORDS_FILE)) {
        Ok(text) => text,
        Err(_) => return,
    };
    for line in text.lines() {
        if let Err(error) = interp.evaluate_line(line) {
            eprintln!("bad saved word '{}': {}", line, error);
        }
    }
}

fn save_words(interp: &Interp, dir: &PathBuf) {
    let mut names: Vec<&String> = interp.words.keys().collect();
    names.sort();
    let mut text = String::new();
    for name in names {
        text.push_str(&format!(": {} {} ;\n", name, interp.words[name]));
    }
    if let Err(error) = std::fs::write(dir.join(WORDS_FILE), text) {
        eprintln!("{}", error);
    }
}

//! Interactive loop over the batch driver.

use crate::driver::Session;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const HISTORY_FILE: &str = ".simp_history";

pub fn start(mut session: Session) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Failed to init readline: {e}");
            return;
        }
    };
    let _ = rl.load_history(HISTORY_FILE);

    println!("simp REPL");
    println!("Commands: (axiom n ty) (def n ty v) (rule set fact) (congr-ite set) (simp t) (infer t)");
    println!("Type 'exit' or Ctrl-D to quit.");

    loop {
        match rl.readline("simp> ") {
            Ok(line) => {
                let line = line.trim();
                if line == "exit" {
                    break;
                }
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);
                match session.exec_line(line) {
                    Ok(Some(out)) => println!("{out}"),
                    Ok(None) => {}
                    Err(e) => println!("error: {e}"),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("readline error: {e}");
                break;
            }
        }
    }
    let _ = rl.save_history(HISTORY_FILE);
}

mod asm;
mod bytecode;
mod lang;
mod runtime;

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::bytecode::codec;
use crate::bytecode::disasm;
use crate::bytecode::ir::Bytecode;
use crate::bytecode::stack_check_error::check_tape;
use crate::runtime::vm::Vm;

fn main() {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|arg| arg.as_str()) {
        None | Some("repl") => run_repl(),
        Some("-h") | Some("--help") => print_usage(),
        Some("run") => match args.get(2) {
            Some(path) => run_file(path),
            None => {
                eprintln!("Usage: fency run <file.fnc>");
                std::process::exit(1);
            }
        },
        Some("dump") => match args.get(2) {
            Some(path) => dump_file(path),
            None => {
                eprintln!("Usage: fency dump <file.fnc>");
                std::process::exit(1);
            }
        },
        Some("build") => build_file(&args[2..]),
        Some(other) => {
            eprintln!("Unknown command '{}'", other);
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("FENCY - Bytecode Assembler & Virtual Machine");
    println!();
    println!("Usage:");
    println!("  fency                     Start the interactive REPL");
    println!("  fency repl                Start the interactive REPL");
    println!("  fency run <file.fnc>      Run a compiled program");
    println!("  fency dump <file.fnc>     Show a program's constants and instructions");
    println!("  fency build <src> [-o <out>]");
    println!("                            Assemble <src> and write a .fnc program");
    println!("  fency --help, -h          Show this help");
}

// =============================================================================
// File commands
// =============================================================================

fn read_program(path: &str) -> Bytecode {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", path, e);
            std::process::exit(1);
        }
    };

    match codec::decode(&data) {
        Ok(bytecode) => bytecode,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

fn run_file(path: &str) {
    let bytecode = read_program(path);

    let mut vm = Vm::new();
    if let Err(e) = vm.run(&bytecode) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn dump_file(path: &str) {
    let bytecode = read_program(path);
    print_listing(&bytecode);
}

fn print_listing(bytecode: &Bytecode) {
    if !bytecode.constants.is_empty() {
        println!("{}", disasm::constants_listing(&bytecode.constants));
    }
    println!("-----");
    println!("{}", disasm::disassemble(&bytecode.tape));
    println!("-----");
}

fn build_file(args: &[String]) {
    let mut source: Option<&String> = None;
    let mut output: Option<&String> = None;

    let mut index = 0;
    while index < args.len() {
        if args[index] == "-o" {
            match args.get(index + 1) {
                Some(path) => {
                    output = Some(path);
                    index += 2;
                }
                None => {
                    eprintln!("-o expects an output path");
                    std::process::exit(1);
                }
            }
        } else if source.is_none() {
            source = Some(&args[index]);
            index += 1;
        } else {
            eprintln!("Usage: fency build <src> [-o <out>]");
            std::process::exit(1);
        }
    }

    let source_path = match source {
        Some(path) => path,
        None => {
            eprintln!("Usage: fency build <src> [-o <out>]");
            std::process::exit(1);
        }
    };

    let text = match fs::read_to_string(source_path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", source_path, e);
            std::process::exit(1);
        }
    };

    let bytecode = match asm::assemble(&text) {
        Ok(bytecode) => bytecode,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = check_tape(&bytecode.tape) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let encoded = match codec::encode(&bytecode) {
        Ok(encoded) => encoded,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let output_path = match output {
        Some(path) => PathBuf::from(path),
        None => default_output_path(source_path),
    };

    if let Err(e) = fs::write(&output_path, &encoded) {
        eprintln!("Failed to write '{}': {}", output_path.display(), e);
        std::process::exit(1);
    }

    println!("wrote {}", output_path.display());
}

fn default_output_path(source: &str) -> PathBuf {
    Path::new(source).with_extension("fnc")
}

// =============================================================================
// REPL
// =============================================================================

fn run_repl() {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Failed to start the line editor: {}", e);
            std::process::exit(1);
        }
    };

    let history_path = env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".fency_history"));
    if let Some(path) = &history_path {
        let _ = editor.load_history(path);
    }

    println!("fency repl - assembly lines build a program; :run, :dump, :reset, :quit");

    let mut lines: Vec<String> = Vec::new();
    let mut program = Bytecode::new(Vec::new(), Vec::new());

    loop {
        let line = match editor.readline(">>> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Failed to read input: {}", e);
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(trimmed);

        match trimmed {
            ":quit" => break,
            ":reset" => {
                lines.clear();
                program = Bytecode::new(Vec::new(), Vec::new());
            }
            ":dump" => print_listing(&program),
            ":run" => run_accumulated(&program),
            command if command.starts_with(':') => {
                eprintln!(
                    "unknown command {} (try :run, :dump, :reset or :quit)",
                    command
                );
            }
            _ => {
                lines.push(trimmed.to_string());
                match asm::assemble(&lines.join("\n")) {
                    Ok(next) => {
                        echo_newest(&program, &next);
                        program = next;
                    }
                    Err(e) => {
                        eprintln!("{}", e);
                        lines.pop();
                    }
                }
            }
        }
    }

    if let Some(path) = &history_path {
        let _ = editor.append_history(path);
    }
}

/// Show what the latest line added: its disassembly when it was an
/// instruction, the pool slot when it was a constant directive.
fn echo_newest(previous: &Bytecode, next: &Bytecode) {
    if next.tape.len() > previous.tape.len() {
        if let Some(line) = disasm::disassemble(&next.tape).lines().last() {
            println!("{}", line);
        }
    } else if next.constants.len() > previous.constants.len() {
        let index = next.constants.len() - 1;
        println!("const {}: {}", index, next.constants[index]);
    }
}

/// A fresh VM every time: globals do not persist between runs.
fn run_accumulated(program: &Bytecode) {
    if let Err(e) = check_tape(&program.tape) {
        eprintln!("{}", e);
        return;
    }

    let mut vm = Vm::new();
    if let Err(e) = vm.run(program) {
        eprintln!("{}", e);
        return;
    }

    if let Some(value) = vm.peek() {
        println!("{}", value);
    }
}

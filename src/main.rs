use std::process;

use crossforge::runner::{register_builtins, Registry};

fn main() {
    let mut registry = Registry::new();
    if let Err(e) = register_builtins(&mut registry) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = crossforge::cli::run(registry) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

use colored::Colorize;

mod cli;

fn main() {
    if let Err(err) = cli::run() {
        eprintln!("{} {}", "error:".red().bold(), err);
        std::process::exit(if err.is_configuration() { 2 } else { 1 });
    }
}

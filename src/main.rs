use colored::Colorize;

fn main() {
    if let Err(err) = rtquery::run() {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

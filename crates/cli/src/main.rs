fn main() {
    if let Err(e) = respack_cli::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

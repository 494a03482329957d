fn main() {
    if let Err(err) = csv_integrate::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

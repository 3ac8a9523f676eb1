fn main() {
    if let Err(err) = healthcare_csv::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

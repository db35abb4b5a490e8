fn main() {
    if let Err(err) = connroute::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn main() {
    if let Err(err) = bitfield_svg::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

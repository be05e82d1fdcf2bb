fn main() {
    std::process::exit(tricolor::run());
}

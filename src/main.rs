fn main() {
    integxr::cli::run();
}

fn main() {
    // Propagate ESP-IDF cross-compilation environment to dependent crates.
    // A plain host build (tests, clippy) sees no ESP env and this is a no-op.
    embuild::espidf::sysenv::output();
}

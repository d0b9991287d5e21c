fn main() {
    // Host builds (tests, `--no-default-features`) have no ESP-IDF sysenv to emit.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}

fn main() {
    // ESP-IDF environment only exists for the firmware build; host
    // tests compile the library without it.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}

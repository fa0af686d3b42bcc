use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Four uppercase letters then five digits. PS2 discs name their boot ELF
// `SLUS_209.17`, dump folders tend to use `SLUS-20917`; both are accepted, as
// is no separator at all. The serial may start anywhere, even right after
// other letters; it must not run on into a sixth digit.
regex!(SERIAL_REGEX, r"([A-Z]{4})[-_]?(\d{3})\.?(\d{2})(?:[^0-9]|$)");

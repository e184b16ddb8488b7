//! On Windows, the bold() implementation from colored::Colorize does not work as expected in the console
//! that hosts the certificate selection dialog. NoBold provides a do-nothing alternative for use on Windows.

pub trait NoBold {
    fn bold(self) -> String;
}

impl NoBold for &str {
    fn bold(self) -> String {
        self.to_string()
    }
}

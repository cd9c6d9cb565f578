//! Severity levels for custom pre-decorated lines

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum Severity {
    Critical = 0,
    Error = 1,
    Warning = 2,
    #[default]
    Notice = 3,
    Info = 4,
    Debug = 5,
}

impl Severity {
    pub fn to_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Notice => "NOTICE",
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
        }
    }

    #[cfg(feature = "colors")]
    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            Severity::Critical => BrightMagenta,
            Severity::Error => Red,
            Severity::Warning => Yellow,
            Severity::Notice => Green,
            Severity::Info => White,
            Severity::Debug => Cyan,
        }
    }

    /// Bracketed prefix for `label`, bold and coloured when `colors` is on.
    pub fn paint(&self, label: &str) -> String {
        let text = format!("[[{}]]", label);
        #[cfg(feature = "colors")]
        {
            use colored::Colorize;
            text.color(self.color_code()).bold().to_string()
        }
        #[cfg(not(feature = "colors"))]
        {
            text
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CRITICAL" | "FATAL" => Ok(Severity::Critical),
            "ERROR" => Ok(Severity::Error),
            "WARN" | "WARNING" => Ok(Severity::Warning),
            "NOTICE" => Ok(Severity::Notice),
            "INFO" => Ok(Severity::Info),
            "DEBUG" => Ok(Severity::Debug),
            _ => Err(format!("Invalid severity: '{}'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("warn".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!("Fatal".parse::<Severity>(), Ok(Severity::Critical));
        assert!("verbose".parse::<Severity>().is_err());
    }

    #[test]
    fn test_paint_keeps_label() {
        colored_off();
        assert_eq!(Severity::Notice.paint("TEST"), "[[TEST]]");
    }

    #[cfg(feature = "colors")]
    fn colored_off() {
        colored::control::set_override(false);
    }

    #[cfg(not(feature = "colors"))]
    fn colored_off() {}
}

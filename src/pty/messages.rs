use crate::theme;
use anstyle::{AnsiColor, Reset, RgbColor, Style};

const PRIMARY_COLOR: Style = Style::new().fg_color(Some(anstyle::Color::Rgb(RgbColor(
    theme::ACCENT_RGB.0,
    theme::ACCENT_RGB.1,
    theme::ACCENT_RGB.2,
))));
const SUCCESS_COLOR: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Green)));
const ERROR_COLOR: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Red)));
const STOPPED_COLOR: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Yellow)));

fn render_arrow() -> String {
    format!("{PRIMARY_COLOR}❱{Reset}")
}

/// Banner written to a terminal before its command starts
#[must_use]
pub fn format_start_message(command: &str) -> Vec<u8> {
    format!("{} {}\r\n\r\n", render_arrow(), command).into()
}

/// Footer written to a terminal after its process ended
#[must_use]
pub fn format_exit_message(exit_code: u32, signal: Option<&str>) -> Vec<u8> {
    let line = match (exit_code, signal) {
        (_, Some(signal)) => format!("Stopped {STOPPED_COLOR}■{Reset} ({signal})"),
        (0, None) => format!("Command succeeded {SUCCESS_COLOR}✓{Reset}"),
        (code, None) => format!("Command failed {ERROR_COLOR}✘{Reset} (exit code {code})"),
    };
    format!("\r\n{} {line}\r\n", render_arrow()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(bytes: &[u8]) -> String {
        let text = String::from_utf8_lossy(bytes);
        regex::Regex::new("\x1b\\[[0-9;]*m")
            .unwrap()
            .replace_all(&text, "")
            .to_string()
    }

    #[test]
    fn test_exit_messages() {
        assert_eq!(
            plain(&format_exit_message(0, None)),
            "\r\n❱ Command succeeded ✓\r\n"
        );
        assert_eq!(
            plain(&format_exit_message(3, None)),
            "\r\n❱ Command failed ✘ (exit code 3)\r\n"
        );
        assert_eq!(
            plain(&format_exit_message(1, Some("Terminated"))),
            "\r\n❱ Stopped ■ (Terminated)\r\n"
        );
    }

    #[test]
    fn test_start_message_contains_command() {
        assert_eq!(plain(&format_start_message("make")), "❱ make\r\n\r\n");
    }
}

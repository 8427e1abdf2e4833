use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Parser};
use questy_engine::{ScreenMode, Size};

#[derive(Debug, Parser)]
#[command(name = "questy", version)]
#[command(about = "Runs the Questy game found in the specified directory")]
#[command(group(ArgGroup::new("screen").multiple(false)))]
#[command(after_help = "Debugging:\n  \
    -d and -D name the signals to trace; `*` traces every signal.\n  \
    A string given with -D is read before the file given with -d.\n  \
    Arguments added with -a are logged with every traced signal.\n\n  \
    questy -D 'place_enter place_leave' -a run1 GAME_DIR")]
pub(crate) struct Cli {
    /// Directory holding game.json and the game data.
    #[arg(value_name = "GAME_DIR")]
    pub(crate) game_dir: Option<PathBuf>,

    /// Play in fullscreen at the display resolution.
    #[arg(short = 'f', long, group = "screen")]
    pub(crate) fullscreen: bool,

    /// Play in a window (default).
    #[arg(short = 'w', long, group = "screen")]
    pub(crate) windowed: bool,

    /// Borderless window covering the whole display.
    #[arg(short = 'F', long, group = "screen")]
    pub(crate) fake_fullscreen: bool,

    /// Window of the logical size multiplied by FACTOR.
    #[arg(short = 'z', long, value_name = "FACTOR", value_parser = parse_zoom, group = "screen")]
    pub(crate) zoom: Option<f32>,

    /// Window of exactly WIDTHxHEIGHT pixels; the game is letterboxed.
    #[arg(short = 's', long, value_name = "WIDTHxHEIGHT", value_parser = parse_screen_size, group = "screen")]
    pub(crate) size: Option<Size>,

    /// Window without decorations.
    #[arg(short = 'B', long)]
    pub(crate) no_border: bool,

    /// Prefer a low-power graphics adapter.
    #[arg(long = "no-hwaccel")]
    pub(crate) no_hardware_acceleration: bool,

    /// Present without vsync.
    #[arg(long = "no-doublebuf")]
    pub(crate) no_double_buffer: bool,

    /// Decode every image at startup instead of on first use.
    #[arg(short = 'e', long)]
    pub(crate) eager: bool,

    /// More log output; repeat for trace level.
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub(crate) verbose: u8,

    /// Less log output; repeat to silence warnings.
    #[arg(short = 'q', long, action = ArgAction::Count)]
    pub(crate) quiet: u8,

    /// Disable colored log output.
    #[arg(long)]
    pub(crate) no_color: bool,

    /// File naming the signals to trace.
    #[arg(short = 'd', long = "debug-with-file", value_name = "FILE")]
    pub(crate) debug_file: Option<PathBuf>,

    /// Signals to trace, separated by spaces or commas.
    #[arg(short = 'D', long = "debug-with-string", value_name = "SIGNALS")]
    pub(crate) debug_string: Option<String>,

    /// Argument handed to the debug hook; may be repeated.
    #[arg(short = 'a', long = "add-debug-argument", value_name = "STRING")]
    pub(crate) debug_args: Vec<String>,
}

impl Cli {
    pub(crate) fn screen_mode(&self) -> ScreenMode {
        if self.fullscreen {
            ScreenMode::Fullscreen
        } else if self.fake_fullscreen {
            ScreenMode::FakeFullscreen
        } else if let Some(size) = self.size {
            ScreenMode::Manual(size)
        } else {
            ScreenMode::Exact {
                zoom: self.zoom.unwrap_or(1.0),
            }
        }
    }

    /// Default log directive from `-v` and `-q`.
    pub(crate) fn log_level(&self) -> &'static str {
        match i16::from(self.verbose) - i16::from(self.quiet) {
            i16::MIN..=-3 => "off",
            -2 => "error",
            -1 => "warn",
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

fn parse_screen_size(raw: &str) -> Result<Size, String> {
    let (width, height) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{raw}'"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .ok()
            .filter(|value| *value > 0)
            .ok_or_else(|| format!("'{part}' is not a positive pixel count"))
    };
    Ok(Size::new(parse(width)?, parse(height)?))
}

fn parse_zoom(raw: &str) -> Result<f32, String> {
    let zoom: f32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if zoom.is_finite() && zoom > 0.0 {
        Ok(zoom)
    } else {
        Err(format!("zoom must be positive, got {zoom}"))
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("questy").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_to_unzoomed_window() {
        let cli = parse(&["games/demo"]);
        assert_eq!(cli.game_dir, Some(PathBuf::from("games/demo")));
        assert_eq!(cli.screen_mode(), ScreenMode::Exact { zoom: 1.0 });
        assert_eq!(cli.log_level(), "info");
        assert!(!cli.eager);
    }

    #[test]
    fn game_dir_is_optional_at_parse_time() {
        assert_eq!(parse(&[]).game_dir, None);
    }

    #[test]
    fn screen_flags_select_mode() {
        assert_eq!(parse(&["-f", "g"]).screen_mode(), ScreenMode::Fullscreen);
        assert_eq!(parse(&["-F", "g"]).screen_mode(), ScreenMode::FakeFullscreen);
        assert_eq!(
            parse(&["-s", "800x600", "g"]).screen_mode(),
            ScreenMode::Manual(Size::new(800, 600))
        );
        assert_eq!(
            parse(&["-z", "2.5", "g"]).screen_mode(),
            ScreenMode::Exact { zoom: 2.5 }
        );
    }

    #[test]
    fn conflicting_screen_flags_are_rejected() {
        assert!(Cli::try_parse_from(["questy", "-f", "-s", "640x480", "g"]).is_err());
        assert!(Cli::try_parse_from(["questy", "-w", "-F", "g"]).is_err());
    }

    #[test]
    fn invalid_size_and_zoom_are_rejected() {
        assert!(Cli::try_parse_from(["questy", "-s", "800", "g"]).is_err());
        assert!(Cli::try_parse_from(["questy", "-s", "0x600", "g"]).is_err());
        assert!(Cli::try_parse_from(["questy", "-z", "-1", "g"]).is_err());
        assert!(Cli::try_parse_from(["questy", "-z", "wide", "g"]).is_err());
    }

    #[test]
    fn verbosity_counts_shift_level() {
        assert_eq!(parse(&["-vv", "g"]).log_level(), "trace");
        assert_eq!(parse(&["-v", "g"]).log_level(), "debug");
        assert_eq!(parse(&["-q", "g"]).log_level(), "warn");
        assert_eq!(parse(&["-qqq", "g"]).log_level(), "off");
        assert_eq!(parse(&["-v", "-q", "g"]).log_level(), "info");
    }

    #[test]
    fn debug_arguments_accumulate() {
        let cli = parse(&["-D", "place_enter", "-a", "one", "-a", "two", "g"]);
        assert_eq!(cli.debug_string.as_deref(), Some("place_enter"));
        assert_eq!(cli.debug_args, vec!["one".to_string(), "two".to_string()]);
    }
}

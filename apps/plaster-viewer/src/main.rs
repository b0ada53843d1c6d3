//! Plaster Engine Demo Viewer
//!
//! Renders a small clay diorama with the PS1-style clay shader while the
//! camera orbits it.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p plaster-viewer -- [OPTIONS]
//! ```
//!
//! ## Controls
//!
//! - `1`-`5`: Switch material preset
//! - `Space`: Pause the orbit
//! - `Escape`: Quit
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod app;

use anyhow::Context;
use plaster_app::{run_app, AppConfig, RendererConfig};

use crate::app::ClayViewer;

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;
const TARGET_FPS: u32 = 240;

/// Options read from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewerArgs {
    vsync: bool,
    target_fps: u32,
    frames_in_flight: usize,
    validation: bool,
    help: bool,
}

impl Default for ViewerArgs {
    fn default() -> Self {
        Self {
            vsync: false,
            target_fps: TARGET_FPS,
            frames_in_flight: RendererConfig::default().frames_in_flight,
            validation: cfg!(debug_assertions),
            help: false,
        }
    }
}

impl ViewerArgs {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Self> {
        let mut parsed = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => parsed.help = true,
                "--vsync" => parsed.vsync = true,
                "--validation" => parsed.validation = true,
                "--no-validation" => parsed.validation = false,
                "--fps" => parsed.target_fps = value(&mut args, "--fps")?,
                "--frames-in-flight" => {
                    parsed.frames_in_flight = value(&mut args, "--frames-in-flight")?;
                }
                _ => {}
            }
        }
        Ok(parsed)
    }

    fn app_config(&self) -> AppConfig {
        AppConfig::new("Plaster Viewer")
            .with_size(WIDTH, HEIGHT)
            .with_target_fps(self.target_fps)
            .with_vsync(self.vsync)
            .with_validation(self.validation)
            .with_renderer(RendererConfig::new().with_frames_in_flight(self.frames_in_flight))
    }
}

/// Parse the value following `flag`.
fn value<T>(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = args
        .next()
        .with_context(|| format!("{flag} needs a value"))?;
    raw.parse()
        .with_context(|| format!("invalid value {raw:?} for {flag}"))
}

fn main() -> anyhow::Result<()> {
    let args = ViewerArgs::parse(std::env::args().skip(1))?;
    if args.help {
        print_help();
        return Ok(());
    }

    run_app::<ClayViewer>(args.app_config())
}

fn print_help() {
    eprintln!(
        "Plaster Engine Demo Viewer

USAGE:
    cargo run -p plaster-viewer -- [OPTIONS]

OPTIONS:
    --vsync                  Present with FIFO (vsync)
    --fps <N>                Frame rate cap, 0 for unlimited (default: {TARGET_FPS})
    --frames-in-flight <N>   Frames the CPU may record ahead of the GPU (default: 2)
    --validation             Enable Vulkan validation layers
    --no-validation          Disable Vulkan validation layers
    -h, --help               Print this help message

CONTROLS:
    1-5                      Switch material preset
    Space                    Pause the orbit
    Escape                   Quit

ENVIRONMENT VARIABLES:
    RUST_LOG                 Set log level (e.g., info, debug, trace)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<ViewerArgs> {
        ViewerArgs::parse(args.iter().map(ToString::to_string))
    }

    #[test]
    fn no_args_uses_defaults() {
        assert_eq!(parse(&[]).unwrap(), ViewerArgs::default());
    }

    #[test]
    fn flags_and_values() {
        let args = parse(&["--vsync", "--fps", "60", "--frames-in-flight", "3", "--no-validation"])
            .unwrap();
        assert!(args.vsync);
        assert_eq!(args.target_fps, 60);
        assert_eq!(args.frames_in_flight, 3);
        assert!(!args.validation);

        let config = args.app_config();
        assert_eq!(config.target_fps, Some(60));
        assert_eq!(config.renderer.frames_in_flight, 3);
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = parse(&["--fps", "fast"]).unwrap_err();
        assert_eq!(err.to_string(), "invalid value \"fast\" for --fps");

        let err = parse(&["--vsync", "--frames-in-flight"]).unwrap_err();
        assert_eq!(err.to_string(), "--frames-in-flight needs a value");

        assert!(parse(&["--frames-in-flight", "-1"]).is_err());
    }

    #[test]
    fn zero_fps_is_unlimited() {
        assert_eq!(parse(&["--fps", "0"]).unwrap().app_config().target_fps, None);
    }
}

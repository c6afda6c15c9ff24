use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use qrbatch_core::{
    ErrorLevel, OutputFormat, Theme, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND, DEFAULT_SIZE,
};

#[derive(Parser)]
#[command(author, version, about = "Generate QR codes one at a time or in batches", long_about = None)]
pub struct Cli {
    /// Directory that receives downloaded images and archives
    #[arg(long, global = true, default_value = "output")]
    pub out: PathBuf,
    /// Directory holding the theme and history state file
    #[arg(long = "data-dir", global = true, default_value = ".")]
    pub data_dir: PathBuf,
    /// Where log lines go
    #[arg(long, global = true, value_enum, default_value_t = LogTarget::File)]
    pub log: LogTarget,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Image edge length in pixels (128..=512, step 32)
    #[arg(long, default_value_t = DEFAULT_SIZE)]
    pub size: u32,
    /// Error correction level: L, M, Q or H
    #[arg(long, default_value_t = ErrorLevel::M)]
    pub level: ErrorLevel,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render one code and save it as PNG or SVG
    Generate {
        /// Text or URL to encode
        text: String,
        #[command(flatten)]
        render: RenderArgs,
        /// Foreground color as #rrggbb
        #[arg(long, default_value = DEFAULT_FOREGROUND)]
        fg: String,
        /// Background color as #rrggbb
        #[arg(long, default_value = DEFAULT_BACKGROUND)]
        bg: String,
        #[arg(long, default_value_t = OutputFormat::Png)]
        format: OutputFormat,
        /// Render and report without saving
        #[arg(long)]
        preview: bool,
        /// Also place the PNG image on the system clipboard
        #[arg(long)]
        copy: bool,
    },
    /// One code per non-empty input line, bundled into a zip archive
    Batch {
        /// Read lines from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Recently generated codes
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Light/dark preference
    Theme {
        #[command(subcommand)]
        command: ThemeCommands,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// Print the stored entries, newest first
    List,
    /// Copy an entry's options back into the form and show them
    Load {
        id: u64,
        /// Regenerate the entry and save it as a new download
        #[arg(long)]
        save: bool,
        #[arg(long, default_value_t = OutputFormat::Png)]
        format: OutputFormat,
    },
    /// Forget every entry
    Clear,
}

#[derive(Subcommand)]
pub enum ThemeCommands {
    Show,
    Toggle,
    Set { theme: Theme },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_batch_with_global_flags() {
        let cli = Cli::try_parse_from([
            "qrbatch", "batch", "--file", "urls.txt", "--size", "320", "--level", "H", "--out",
            "zips", "--log", "both",
        ])
        .unwrap();
        assert_eq!(cli.out, PathBuf::from("zips"));
        assert_eq!(cli.log, LogTarget::Both);
        match cli.command {
            Commands::Batch { file, render } => {
                assert_eq!(file, Some(PathBuf::from("urls.txt")));
                assert_eq!(render.size, 320);
                assert_eq!(render.level, ErrorLevel::H);
            }
            _ => panic!("expected batch"),
        }
    }

    #[test]
    fn generate_defaults_match_form_defaults() {
        let cli = Cli::try_parse_from(["qrbatch", "generate", "hello"]).unwrap();
        match cli.command {
            Commands::Generate {
                text,
                render,
                fg,
                bg,
                format,
                preview,
                copy,
            } => {
                assert_eq!(text, "hello");
                assert_eq!(render.size, 256);
                assert_eq!(render.level, ErrorLevel::M);
                assert_eq!((fg.as_str(), bg.as_str()), ("#000000", "#ffffff"));
                assert_eq!(format, OutputFormat::Png);
                assert!(!preview);
                assert!(!copy);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn history_load_only_saves_when_asked() {
        let cli = Cli::try_parse_from(["qrbatch", "history", "load", "42"]).unwrap();
        match cli.command {
            Commands::History {
                command: HistoryCommands::Load { id, save, format },
            } => {
                assert_eq!(id, 42);
                assert!(!save);
                assert_eq!(format, OutputFormat::Png);
            }
            _ => panic!("expected history load"),
        }

        let cli = Cli::try_parse_from([
            "qrbatch", "history", "load", "42", "--save", "--format", "svg",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::History {
                command: HistoryCommands::Load {
                    save: true,
                    format: OutputFormat::Svg,
                    ..
                },
            }
        ));
    }

    #[test]
    fn rejects_unknown_theme() {
        assert!(Cli::try_parse_from(["qrbatch", "theme", "set", "sepia"]).is_err());
    }
}

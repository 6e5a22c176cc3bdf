use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use conversion_core::{CompressionLevel, NumberPosition, ToolOptions};
use conversion_engine::worker::InterceptMode;
use conversion_engine::API_URL_ENV;
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "convert", version, about = "Upload documents to the conversion API")]
pub struct Cli {
    /// -v for debug output, -vv for trace.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write the log to ./engine.log.
    #[arg(long, global = true)]
    pub log_file: bool,

    #[arg(long, env = API_URL_ENV, global = true)]
    pub api_url: Option<Url>,

    /// Directory holding the saved client state.
    #[arg(long, global = true, default_value = ".")]
    pub state_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List available tools.
    Tools,
    /// Convert a single file.
    Run {
        tool: String,
        file: PathBuf,
        #[arg(long, default_value = ".")]
        out: PathBuf,
        #[command(flatten)]
        options: OptionArgs,
    },
    /// Convert several files one after another.
    Batch {
        tool: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    ResetPassword {
        #[arg(long)]
        token: String,
        #[arg(long)]
        new_password: String,
    },
    Logout,
    /// Toggle between light and dark theme.
    Theme,
    /// Install the offline cache worker against an origin and resolve paths through it.
    Worker {
        #[arg(long)]
        origin: Url,
        #[arg(long, default_value_t = InterceptMode::CacheFirstStatic)]
        worker_mode: InterceptMode,
        #[arg(long)]
        cache_name: Option<String>,
        /// Paths to precache instead of the built-in app shell.
        #[arg(long, value_delimiter = ',')]
        manifest: Vec<String>,
        paths: Vec<String>,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct OptionArgs {
    /// Overlay or watermark text.
    #[arg(long)]
    pub text: Option<String>,
    #[arg(long)]
    pub x: Option<f64>,
    #[arg(long)]
    pub y: Option<f64>,
    #[arg(long, value_parser = parse_position)]
    pub position: Option<NumberPosition>,
    #[arg(long)]
    pub start_from: Option<u32>,
    #[arg(long)]
    pub end_at: Option<u32>,
    #[arg(long, value_parser = parse_rotation)]
    pub rotation: Option<u16>,
    #[arg(long)]
    pub margin: Option<u32>,
    #[arg(long, value_parser = parse_level)]
    pub level: Option<CompressionLevel>,
}

impl OptionArgs {
    /// Options for `tool_id`. Flags a tool does not take are ignored.
    pub fn for_tool(&self, tool_id: &str) -> Result<ToolOptions, String> {
        let options = match tool_id {
            "add-text-pdf" => ToolOptions::TextOverlay {
                text: self
                    .text
                    .clone()
                    .filter(|text| !text.trim().is_empty())
                    .ok_or("--text is required for add-text-pdf")?,
                x: self.x.unwrap_or(100.0),
                y: self.y.unwrap_or(100.0),
            },
            "watermark-pdf" => ToolOptions::Watermark {
                text: self
                    .text
                    .clone()
                    .filter(|text| !text.trim().is_empty())
                    .ok_or("--text is required for watermark-pdf")?,
            },
            "page-numbers-pdf" => {
                let start_from = self.start_from.unwrap_or(1);
                if let Some(end_at) = self.end_at {
                    if end_at < start_from {
                        return Err(format!(
                            "--end-at {end_at} is before --start-from {start_from}"
                        ));
                    }
                }
                ToolOptions::PageNumbering {
                    position: self.position.unwrap_or_default(),
                    start_from,
                    end_at: self.end_at,
                }
            }
            "rotate-pdf" => ToolOptions::Rotation {
                degrees: self.rotation.unwrap_or(90),
            },
            "crop-pdf" => ToolOptions::CropMargin {
                margin: self.margin.unwrap_or(50),
            },
            "compress-pdf" => ToolOptions::Compression {
                level: self.level.unwrap_or_default(),
            },
            _ => ToolOptions::None,
        };
        Ok(options)
    }
}

fn parse_position(raw: &str) -> Result<NumberPosition, String> {
    NumberPosition::parse(raw).ok_or_else(|| format!("unknown position: {raw}"))
}

fn parse_level(raw: &str) -> Result<CompressionLevel, String> {
    CompressionLevel::parse(raw).ok_or_else(|| format!("unknown compression level: {raw}"))
}

fn parse_rotation(raw: &str) -> Result<u16, String> {
    match raw.trim().parse::<u16>() {
        Ok(degrees @ (90 | 180 | 270)) => Ok(degrees),
        _ => Err(format!("rotation must be 90, 180 or 270, got {raw}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_parses_tool_options() {
        let cli = Cli::try_parse_from([
            "convert",
            "run",
            "page-numbers-pdf",
            "doc.pdf",
            "--position",
            "top-right",
            "--start-from",
            "3",
        ])
        .unwrap();
        let Command::Run { tool, options, .. } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(
            options.for_tool(&tool).unwrap(),
            ToolOptions::PageNumbering {
                position: NumberPosition::TopRight,
                start_from: 3,
                end_at: None,
            }
        );
    }

    #[test]
    fn text_tools_require_text() {
        let options = OptionArgs::default();
        assert!(options.for_tool("watermark-pdf").is_err());
        assert!(options.for_tool("add-text-pdf").is_err());
        assert_eq!(options.for_tool("word-to-pdf").unwrap(), ToolOptions::None);
    }

    #[test]
    fn invalid_rotation_is_rejected() {
        let parsed =
            Cli::try_parse_from(["convert", "run", "rotate-pdf", "a.pdf", "--rotation", "45"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn worker_mode_parses() {
        let cli = Cli::try_parse_from([
            "convert",
            "worker",
            "--origin",
            "https://app.example.com",
            "--worker-mode",
            "disabled",
            "--manifest",
            "/,/app.js",
            "/logo.png",
        ])
        .unwrap();
        let Command::Worker {
            worker_mode,
            manifest,
            paths,
            ..
        } = cli.command
        else {
            panic!("expected worker");
        };
        assert_eq!(worker_mode, InterceptMode::Disabled);
        assert_eq!(manifest, vec!["/".to_string(), "/app.js".to_string()]);
        assert_eq!(paths, vec!["/logo.png".to_string()]);
    }

    #[test]
    fn page_range_must_be_ordered() {
        let options = OptionArgs {
            start_from: Some(5),
            end_at: Some(2),
            ..OptionArgs::default()
        };
        assert!(options.for_tool("page-numbers-pdf").is_err());
    }
}

//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use deskstat_core::widget::{Border, Style, WidgetOptions};

use crate::resources::ResourceSet;

#[derive(Parser)]
#[command(name = "deskstat", version, about = "Desktop status publisher and bar widgets")]
pub struct Cli {
    /// Status bus socket (default: $XDG_RUNTIME_DIR/deskstat/deskstat.sock)
    #[arg(long, short = 's', global = true, env = "DESKSTAT_SOCKET")]
    pub socket_path: Option<PathBuf>,

    /// Log at info level
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Log at debug level
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn socket_path(&self) -> PathBuf {
        self.socket_path.clone().unwrap_or_else(default_socket_path)
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Publish status properties on the bus
    Publish(PublishOpts),
    /// Render subscribed properties for a status bar
    Widget(WidgetOpts),
    /// Print every published property as JSON
    Props,
}

#[derive(Args, Clone, Debug, Default)]
pub struct PublishOpts {
    /// Publish CPU usage
    #[arg(long)]
    pub stat: bool,

    /// Publish the mean CPU frequency
    #[arg(long)]
    pub cpuinfo: bool,

    /// Publish the 1-minute load average
    #[arg(long)]
    pub loadavg: bool,

    /// Publish memory and swap usage
    #[arg(long)]
    pub meminfo: bool,

    /// Publish the busiest network interface with its rates and totals
    #[arg(long)]
    pub netdev: bool,

    /// Publish every resource metric
    #[arg(long)]
    pub all: bool,

    /// Do not monitor the audio mixer
    #[arg(long)]
    pub no_audio: bool,

    /// Do not track media players
    #[arg(long)]
    pub no_media: bool,

    /// Resource tick period in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub tick_ms: u64,
}

impl PublishOpts {
    pub fn resources(&self) -> ResourceSet {
        if self.all {
            return ResourceSet::all();
        }
        ResourceSet {
            stat: self.stat,
            cpuinfo: self.cpuinfo,
            loadavg: self.loadavg,
            meminfo: self.meminfo,
            netdev: self.netdev,
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct WidgetOpts {
    /// Output markup: polybar or tmux
    #[arg(long, default_value = "polybar")]
    pub style: Style,

    /// Border: none, overline or underline (polybar only)
    #[arg(long, default_value = "none")]
    pub border: Border,

    /// Color labels with the tag's highlight color
    #[arg(long)]
    pub highlight: bool,

    /// Paint the tag's background color
    #[arg(long)]
    pub background: bool,

    /// Show values only, no labels
    #[arg(long)]
    pub text: bool,

    /// Spaces around each tag (0-4)
    #[arg(long, default_value_t = 1)]
    pub padding: usize,

    /// Separator repetitions between tags (0-4)
    #[arg(long, default_value_t = 1)]
    pub spacing: usize,

    /// Separator glyph
    #[arg(long, default_value = " ")]
    pub separator: String,

    /// Print once and exit instead of following changes
    #[arg(long)]
    pub once: bool,

    /// Tags to render, in order
    #[arg(required = true)]
    pub tags: Vec<String>,
}

impl WidgetOpts {
    pub fn options(&self) -> WidgetOptions {
        WidgetOptions {
            style: self.style,
            border: self.border,
            highlight: self.highlight,
            background: self.background,
            text_only: self.text,
            padding: self.padding,
            spacing: self.spacing,
            separator: self.separator.clone(),
        }
    }
}

/// Default socket path, per user.
pub fn default_socket_path() -> PathBuf {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(format!("{dir}/deskstat/deskstat.sock"));
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/deskstat-{user}/deskstat.sock"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_flags() {
        let cli = Cli::parse_from(["deskstat", "publish", "--all", "--no-audio"]);
        let Command::Publish(opts) = cli.command else {
            panic!("expected publish");
        };
        assert_eq!(opts.resources(), ResourceSet::all());
        assert!(opts.no_audio);
        assert!(!opts.no_media);
        assert_eq!(opts.tick_ms, 1000);
    }

    #[test]
    fn publish_resource_flags_are_independent() {
        let cli = Cli::parse_from(["deskstat", "publish", "--stat", "--netdev"]);
        let Command::Publish(opts) = cli.command else {
            panic!("expected publish");
        };
        let set = opts.resources();
        assert!(set.stat && set.netdev);
        assert!(!set.cpuinfo && !set.loadavg && !set.meminfo);
    }

    #[test]
    fn widget_options_and_tags() {
        let cli = Cli::parse_from([
            "deskstat", "-s", "/tmp/x.sock", "widget", "--style", "tmux", "--highlight",
            "--spacing", "2", "--separator", "|", "Mpris", "Volume",
        ]);
        assert_eq!(cli.socket_path(), PathBuf::from("/tmp/x.sock"));
        let Command::Widget(opts) = cli.command else {
            panic!("expected widget");
        };
        assert_eq!(opts.tags, vec!["Mpris", "Volume"]);
        let o = opts.options();
        assert_eq!(o.style, Style::Tmux);
        assert_eq!(o.border, Border::None);
        assert!(o.highlight);
        assert_eq!(o.gap(), "||");
    }

    #[test]
    fn widget_rejects_unknown_style() {
        assert!(Cli::try_parse_from(["deskstat", "widget", "--style", "i3", "Mpris"]).is_err());
        assert!(Cli::try_parse_from(["deskstat", "widget"]).is_err());
    }
}

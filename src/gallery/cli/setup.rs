use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Returns the version string, with the git hash appended for builds made
/// from a checkout. Format: "0.3.0" or "0.3.0@abc1234"
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{}", VERSION, GIT_HASH)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "gallery", bin_name = "gallery", version = get_version())]
#[command(about = "Browse and edit users, albums and photos on a gallery server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Server to talk to (overrides the configured base-url)
    #[arg(long, global = true, env = "GALLERY_BASE_URL", help_heading = "Options")]
    pub base_url: Option<String>,

    /// Delay every request by this many milliseconds
    #[arg(long, global = true, value_name = "MS", help_heading = "Options")]
    pub latency_ms: Option<u64>,

    /// Directory holding config.json
    #[arg(long, global = true, env = "GALLERY_CONFIG_DIR", help_heading = "Options")]
    pub config_dir: Option<PathBuf>,

    /// Verbose output (request logging)
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List, add or remove users
    #[command(subcommand, display_order = 1)]
    Users(UsersCommand),

    /// List, add or remove a user's albums
    #[command(subcommand, display_order = 2)]
    Albums(AlbumsCommand),

    /// List, add or remove the photos in an album
    #[command(subcommand, display_order = 3)]
    Photos(PhotosCommand),

    /// Show every user with their albums and photos
    #[command(display_order = 4)]
    Browse,

    /// List the operations the client knows about
    #[command(display_order = 5)]
    Endpoints,

    /// Get or set configuration values
    #[command(display_order = 6)]
    Config {
        /// Configuration key (base-url, latency-ms, keep-unused-secs)
        key: Option<String>,

        /// Value to set
        value: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    /// List all users
    #[command(alias = "ls")]
    List,

    /// Add a user (a random name is generated when omitted)
    Add {
        #[arg(trailing_var_arg = true)]
        name: Vec<String>,
    },

    /// Remove a user
    #[command(alias = "rm")]
    Remove { id: String },
}

#[derive(Subcommand, Debug)]
pub enum AlbumsCommand {
    /// List a user's albums
    #[command(alias = "ls")]
    List { user_id: String },

    /// Add an album with a generated title
    Add { user_id: String },

    /// Remove an album
    #[command(alias = "rm")]
    Remove { album_id: String },
}

#[derive(Subcommand, Debug)]
pub enum PhotosCommand {
    /// List the photos in an album
    #[command(alias = "ls")]
    List { album_id: String },

    /// Add a photo with a generated title and image
    Add { album_id: String },

    /// Remove a photo
    #[command(alias = "rm")]
    Remove { photo_id: String },
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
    fn parses_nested_commands_with_global_flags() {
        let cli = Cli::try_parse_from([
            "gallery",
            "albums",
            "add",
            "3",
            "--base-url",
            "http://example.test",
            "-v",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Albums(AlbumsCommand::Add { ref user_id }) if user_id == "3"
        ));
        assert_eq!(cli.base_url.as_deref(), Some("http://example.test"));
        assert!(cli.verbose);
    }

    #[test]
    fn user_names_may_span_words() {
        let cli = Cli::try_parse_from(["gallery", "users", "add", "Ada", "Lovelace"]).unwrap();
        match cli.command {
            Commands::Users(UsersCommand::Add { name }) => assert_eq!(name.join(" "), "Ada Lovelace"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn remove_requires_an_id() {
        assert!(Cli::try_parse_from(["gallery", "photos", "remove"]).is_err());
    }
}

use clap::{Args, Parser, Subcommand};
use modelwire_engine::Backend;

#[derive(Parser)]
#[command(name = "modelwire", about = "Encode and decode schema-described records")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Debug)]
pub struct GlobalArgs {
    /// Path to TOML config file
    #[arg(long, global = true, default_value = "modelwire.toml", env = "MODELWIRE_CONFIG")]
    pub config: String,

    /// Override the configured backend (accelerated, portable)
    #[arg(long, global = true)]
    pub backend: Option<Backend>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encode a JSON document as a record
    Encode(EncodeArgs),
    /// Decode a record to JSON
    Decode(DecodeArgs),
    /// Print the wire schema of a type
    Schema(SchemaArgs),
    /// Derive every configured schema and report conflicts
    Check,
}

#[derive(Args, Clone, Debug)]
pub struct EncodeArgs {
    /// Record type name
    #[arg(long = "type")]
    pub type_name: String,

    /// JSON input file (stdin if omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Output file (stdout if omitted)
    #[arg(long)]
    pub output: Option<String>,

    /// Write hex text instead of raw bytes
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Clone, Debug)]
pub struct DecodeArgs {
    /// Record type name
    #[arg(long = "type")]
    pub type_name: String,

    /// Encoded input file (stdin if omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Input is hex text
    #[arg(long)]
    pub hex: bool,

    /// Single-line JSON output
    #[arg(long)]
    pub compact: bool,
}

#[derive(Args, Clone, Debug)]
pub struct SchemaArgs {
    /// Record type name
    #[arg(long = "type")]
    pub type_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "modelwire",
            "decode",
            "--type",
            "Person",
            "--hex",
            "--backend",
            "portable",
            "--config",
            "types.toml",
        ])
        .unwrap();
        assert_eq!(cli.global.backend, Some(Backend::Portable));
        assert_eq!(cli.global.config, "types.toml");
        assert!(matches!(cli.command, Commands::Decode(ref a) if a.hex && a.type_name == "Person"));
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(Cli::try_parse_from(["modelwire", "check", "--backend", "turbo"]).is_err());
    }
}

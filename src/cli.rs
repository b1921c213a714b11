use crate::profile::CompressionProfile;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "img-compressor",
    about = "Compress uploaded images to resized JPEGs, over HTTP or from the command line",
    long_about = "img-compressor resizes images to at most 800px and re-encodes them as JPEG. \
                  Run it as an HTTP service that answers POST /api/compress, or compress a batch \
                  of local files directly (optionally through a running service).",
    version,
    after_help = "EXAMPLES:\n  \
    img-compressor serve --port 5000\n  \
    img-compressor compress ./photos -r -o ./compressed\n  \
    img-compressor compress a.png b.jpg -o out --profile size-budget\n  \
    img-compressor compress \"./shots/*.png\" -o out --server http://localhost:5000"
)]
pub struct Args {
    #[arg(short, long, global = true, help = "Only print warnings and errors")]
    pub quiet: bool,

    #[arg(short, long, global = true, help = "Print debug logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "Run the compression HTTP service",
        long_about = "Serve POST /api/compress and GET /temp/<name>. Compressed files are held \
                      in the temp directory until downloaded once or until they expire."
    )]
    Serve {
        #[arg(
            short = 'c',
            long,
            help = "TOML configuration file",
            long_help = "Path to a TOML file with host, port, temp_dir, max_upload_bytes, \
                         temp_max_age_secs and profile. Command-line flags override it."
        )]
        config: Option<PathBuf>,

        #[arg(long, help = "Address to bind (default: 127.0.0.1)")]
        host: Option<String>,

        #[arg(short = 'p', long, help = "Port to listen on (default: 5000)")]
        port: Option<u16>,

        #[arg(long, help = "Directory for compressed files awaiting download (default: ./temp)")]
        temp_dir: Option<PathBuf>,

        #[arg(long, value_enum, help = "Compression profile (default: quality)")]
        profile: Option<CompressionProfile>,
    },

    #[command(
        about = "Compress a batch of local images",
        long_about = "Validate and compress every input, then write compressed_image_<n>.jpg files \
                      to the output directory. Nothing is written unless every image compresses."
    )]
    Compress {
        #[arg(
            required = true,
            help = "Input files, directories, or glob patterns",
            long_help = "Files, directories, or glob expressions. \
                         Examples: './images', '*.png', '/path/to/images/*.jpg'"
        )]
        inputs: Vec<String>,

        #[arg(short = 'o', long, default_value = ".", help = "Output directory path")]
        output: PathBuf,

        #[arg(
            long,
            value_enum,
            default_value_t = CompressionProfile::Quality,
            help = "Compression profile",
            long_help = "quality: 800px width cap, JPEG quality 80. \
                         size-budget: 800px longest side, output held under 1 MiB."
        )]
        profile: CompressionProfile,

        #[arg(short = 'r', long, help = "Process subdirectories recursively")]
        recursive: bool,

        #[arg(long, help = "Compress images in parallel")]
        parallel: bool,

        #[arg(
            short = 'j',
            long,
            help = "Number of parallel threads (default: auto)",
            long_help = "Number of threads used with --parallel. \
                         If not specified, uses number of CPU cores."
        )]
        threads: Option<usize>,

        #[arg(
            short = 's',
            long,
            help = "Compress through a running service at this URL",
            long_help = "Base URL of an img-compressor service, e.g. http://localhost:5000. \
                         Each image is uploaded to /api/compress and the result downloaded."
        )]
        server: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_compress_defaults() {
        let args = Args::parse_from(["img-compressor", "compress", "a.png"]);
        match args.command {
            Commands::Compress {
                inputs,
                output,
                profile,
                parallel,
                server,
                ..
            } => {
                assert_eq!(inputs, vec!["a.png".to_string()]);
                assert_eq!(output, PathBuf::from("."));
                assert_eq!(profile, CompressionProfile::Quality);
                assert!(!parallel);
                assert!(server.is_none());
            }
            _ => panic!("expected compress"),
        }
    }

    #[test]
    fn test_parse_serve_overrides() {
        let args = Args::parse_from([
            "img-compressor",
            "-q",
            "serve",
            "--port",
            "8080",
            "--profile",
            "size-budget",
        ]);
        assert!(args.quiet);
        match args.command {
            Commands::Serve { port, profile, .. } => {
                assert_eq!(port, Some(8080));
                assert_eq!(profile, Some(CompressionProfile::SizeBudget));
            }
            _ => panic!("expected serve"),
        }
    }
}
